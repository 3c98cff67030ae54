//! JSON-RPC protocol handling

pub mod codec;
pub mod message;
pub mod methods;

pub use codec::{read_message, write_message};
pub use message::{
    JsonRpcError, JsonRpcHandler, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId,
};

//! Method names exchanged with the Rascal language servers

/// client→server: textual content of a virtual location
pub const LOCATION_CONTENTS: &str = "rascal/locationContents";
/// client→server: load a language into the parametric server
pub const SEND_REGISTER_LANGUAGE: &str = "rascal/sendRegisterLanguage";
/// server→client: a language was declared on the base server
pub const RECEIVE_REGISTER_LANGUAGE: &str = "rascal/receiveRegisterLanguage";
/// server→client: display served content in a panel
pub const SHOW_CONTENT: &str = "rascal/showContent";
/// client→server: port of the IDE services endpoint
pub const SUPPLY_IDE_SERVICES_CONFIGURATION: &str = "rascal/supplyIDEServicesConfiguration";
/// client→server: compilation classpath of the project owning a file
pub const SUPPLY_PROJECT_COMPILATION_CLASSPATH: &str = "rascal/supplyProjectCompilationClasspath";

pub const INITIALIZE: &str = "initialize";
pub const INITIALIZED: &str = "initialized";

pub const LOG_MESSAGE: &str = "window/logMessage";
pub const SHOW_MESSAGE: &str = "window/showMessage";

/// Server requests acknowledged with a `null` result
pub const ACKNOWLEDGED_SERVER_REQUESTS: &[&str] = &[
    "client/registerCapability",
    "client/unregisterCapability",
    "window/workDoneProgress/create",
];

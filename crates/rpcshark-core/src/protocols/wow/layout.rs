pub const COMMAND_OFFSET: usize = 0;
pub const COMMAND_LEN: usize = 1;

pub const CMD_AUTH_LOGON_CHALLENGE: u8 = 0x00;
pub const CMD_AUTH_LOGON_PROOF: u8 = 0x01;
pub const CMD_AUTH_RECONNECT_CHALLENGE: u8 = 0x02;
pub const CMD_AUTH_RECONNECT_PROOF: u8 = 0x03;
pub const CMD_SURVEY_RESULT: u8 = 0x04;
pub const CMD_REALM_LIST: u8 = 0x10;
pub const CMD_XFER_INITIATE: u8 = 0x30;
pub const CMD_XFER_DATA: u8 = 0x31;
pub const CMD_XFER_ACCEPT: u8 = 0x32;
pub const CMD_XFER_RESUME: u8 = 0x33;
pub const CMD_XFER_CANCEL: u8 = 0x34;

/// Size field positions (u16 little-endian, counting the bytes after it).
pub const REALM_LIST_SIZE_OFFSET: usize = 1;
pub const LOGON_CHALLENGE_SIZE_OFFSET: usize = 2;

pub const DEFAULT_TCP_PORT: u16 = 3724;
/// Registry key for the authentication protocol.
pub const PROTOCOL_ID: &str = "wow";

pub const COMMANDS: [(u8, &str); 11] = [
    (CMD_AUTH_LOGON_CHALLENGE, "CMD_AUTH_LOGON_CHALLENGE"),
    (CMD_AUTH_LOGON_PROOF, "CMD_AUTH_LOGON_PROOF"),
    (CMD_AUTH_RECONNECT_CHALLENGE, "CMD_AUTH_RECONNECT_CHALLENGE"),
    (CMD_AUTH_RECONNECT_PROOF, "CMD_AUTH_RECONNECT_PROOF"),
    (CMD_SURVEY_RESULT, "CMD_SURVEY_RESULT"),
    (CMD_REALM_LIST, "CMD_REALM_LIST"),
    (CMD_XFER_INITIATE, "CMD_XFER_INITIATE"),
    (CMD_XFER_DATA, "CMD_XFER_DATA"),
    (CMD_XFER_ACCEPT, "CMD_XFER_ACCEPT"),
    (CMD_XFER_RESUME, "CMD_XFER_RESUME"),
    (CMD_XFER_CANCEL, "CMD_XFER_CANCEL"),
];

/// The default URL used to open a gateway connection.
pub const GATEWAY_URL: &str = "wss://gateway.discord.gg";
/// The gateway protocol version this client speaks.
pub const GATEWAY_VERSION: u8 = 10;

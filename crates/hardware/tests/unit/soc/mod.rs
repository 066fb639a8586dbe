
/// Packet line access and completion.
pub mod packet;

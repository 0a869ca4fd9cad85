pub mod packet_channel;
pub mod packet_tag;

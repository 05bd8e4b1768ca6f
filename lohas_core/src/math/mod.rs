pub mod five_lines;
pub mod lohas_channel;

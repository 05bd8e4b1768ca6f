pub mod enums;
pub mod lohas_error;
pub mod time;
pub mod utils;

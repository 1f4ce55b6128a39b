pub mod fanout;
pub mod pagination;
pub mod time;

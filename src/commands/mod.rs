// list, show
pub mod listing;

// publish, get
pub mod message;

// declare, delete, close, purge
pub mod resource;

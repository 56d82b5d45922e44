//! HTTP-based acquisition: the fetch primitive, markup extraction, and the
//! static frame crawler. None of it needs a browser, which also means none
//! of it sees URLs a player builds in JavaScript.

pub mod crawler;
pub mod extract;
pub mod http_client;

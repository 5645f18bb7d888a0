pub mod requester;

pub use requester::{Requester, ANONYMOUS_REQUESTER, REQUESTER_HEADER};

/// Domain models for TaskDesk
///
/// Plain data types. Persistence lives behind the traits in
/// [`crate::store`].
///
/// # Models
///
/// - `user`: Accounts, roles and the owner summary embedded in task responses
/// - `task`: Tasks, their filters and aggregate stats
/// - `page`: Pagination request and metadata

pub mod page;
pub mod task;
pub mod user;

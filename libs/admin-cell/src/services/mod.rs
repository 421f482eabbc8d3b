pub mod stats;
pub mod users;

pub use stats::StatsService;
pub use users::UserAdminService;

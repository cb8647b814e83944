mod invite_tracker;
pub use invite_tracker::invite_tracker;

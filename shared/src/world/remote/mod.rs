pub mod entity_waitlist;

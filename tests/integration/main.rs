mod fallback;
mod helpers;
mod lifecycle;
mod persistence;
mod reconciliation;
mod switching;

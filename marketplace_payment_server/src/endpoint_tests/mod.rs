//! Endpoint tests: the full middleware + handler stack against a throwaway database.
mod helpers;

mod delivery;
mod payments;
mod webhook;

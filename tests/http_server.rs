// Integration test root for http_server tests.
// Submodules live under `tests/http_server/` directory.

#[path = "http_server/helpers.rs"]
mod helpers;

#[path = "http_server/webhook.rs"]
mod webhook;

#[path = "http_server/health.rs"]
mod health;

//! piproto-api
//!
//! HTTP edge for the PiProtocol backend. JSON in, JSON out, camelCase fields.
//!
//! Routes:
//!   GET  /health                              — liveness
//!   GET  /news                                — announcement feed
//!   GET  /user/:userId                        — full account view (404 if unknown)
//!   GET  /user/:userId/transactions           — full ledger, newest first
//!   POST /mining/start                        — open a mining session
//!   POST /claim                               — close the session, credit coins
//!   POST /mining/manual                       — manual click, cooldown enforced
//!   POST /convert/coins-to-pi                 — coins → pi
//!   POST /convert/pi-to-usdt                  — pi → usdt
//!   POST /withdraw                            — record a withdrawal request
//!   POST /referral/register                   — inviter → invitee edge
//!   POST /referral/stats                      — counts and friend lists
//!   POST /referral/activate                   — mark an invitee active
//!   POST /referral/share                      — log a referral-link share
//!   GET  /referral/friends/invited/:userId    — invited friends
//!   GET  /referral/friends/active/:userId     — active friends
//!   POST /tasks/complete                      — flag a task completed
//!   POST /tasks/claim                         — pay a task reward once
//!   POST /profile/update                      — first/last name
//!
//! Every failure is `{"success": false, "error": "..."}`.

pub mod api;
pub mod error;
pub mod server;
pub mod types;

pub use api::router;
pub use error::ApiError;
pub use server::{ApiServer, ApiServerHandle, ApiServerState};

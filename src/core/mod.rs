// ─── VitaLite Launcher Core ───
// Provisions the JDK, keeps the client up to date and starts it.
//
// Architecture:
//   core/
//     platform    — OS / CPU detection, per-platform layout
//     state/      — On-disk layout + launcher settings snapshot
//     progress    — Stage / overall progress contract and sinks
//     http        — Shared HTTP client and timeouts
//     downloader/ — Streamed downloads with throttled progress
//     java/       — JDK provisioning + archive extraction
//     version/    — Version marker, release feeds, update decision
//     update/     — Applies updates to the installed client
//     launch/     — Command builder, process spawner, ready handshake
//     bootstrap   — provision → update → launch sequence

pub mod bootstrap;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod platform;
pub mod progress;
pub mod state;
pub mod update;
pub mod version;

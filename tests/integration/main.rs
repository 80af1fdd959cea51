// Integration test suite for the ephemeral relay's HTTP surface.
// WebSocket end-to-end behavior lives in tests/ws_relay.rs, since it needs a
// real bound socket rather than Rocket's local dispatch.

mod common;

mod rooms;

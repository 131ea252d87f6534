use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time as signed 64-bit integer nanoseconds since the Unix epoch.
///
/// Callers sample this once at the moment of intent (message construction),
/// never at serialization time, so queueing delays inside the process are not
/// attributed to the network.
pub fn now_nanos() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_nanos() as i64,
        Err(_) => 0,
    }
}

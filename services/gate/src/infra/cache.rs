use chrono::Utc;
use deadpool_redis::Pool;
use deadpool_redis::redis;
use uuid::Uuid;

use crate::domain::repository::RateLimiter;
use crate::domain::types::RateLimitAction;
use crate::error::GateError;

/// Sliding-window limiter over a Redis sorted set per (action, ip). Members
/// are scored by millisecond timestamp; each check trims the window, counts,
/// and records the attempt only when allowed.
#[derive(Clone)]
pub struct RedisRateLimiter {
    pub pool: Pool,
}

fn window_key(ip: &str, action: RateLimitAction) -> String {
    format!("gate:rate:{}:{}", action.as_str(), ip)
}

// Trim, count and conditionally record in one script so two checks racing
// at the limit boundary cannot both pass.
// KEYS[1] window key; ARGV: cutoff ms, max attempts, now ms, member, ttl s.
const CHECK_AND_RECORD: &str = r#"
redis.call('ZREMRANGEBYSCORE', KEYS[1], 0, ARGV[1])
local count = redis.call('ZCARD', KEYS[1])
if count >= tonumber(ARGV[2]) then
  return 0
end
redis.call('ZADD', KEYS[1], ARGV[3], ARGV[4])
redis.call('EXPIRE', KEYS[1], ARGV[5])
return 1
"#;

impl RateLimiter for RedisRateLimiter {
    async fn check_and_record(
        &self,
        ip: &str,
        action: RateLimitAction,
        max_attempts: u32,
        window_secs: i64,
    ) -> Result<bool, GateError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| GateError::Internal(e.into()))?;
        let key = window_key(ip, action);
        let now_ms = Utc::now().timestamp_millis();
        let cutoff = now_ms - window_secs * 1000;

        // Unique member so two attempts in the same millisecond both count
        let member = format!("{now_ms}:{}", Uuid::new_v4());
        let allowed: i64 = redis::Script::new(CHECK_AND_RECORD)
            .key(&key)
            .arg(cutoff)
            .arg(max_attempts)
            .arg(now_ms)
            .arg(member)
            .arg(window_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| GateError::Internal(e.into()))?;

        Ok(allowed == 1)
    }
}

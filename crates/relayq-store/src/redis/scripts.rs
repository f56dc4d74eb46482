//! Lua scripts backing every multi-key transition.
//!
//! Each script runs atomically on the server, which is what makes claims
//! exclusive across processes. Job hash keys are built inside the script
//! from the prefix passed as an argument.

/// Pop the oldest waiting id that still has a record and mark it active.
///
/// KEYS: waiting list, active zset.
/// ARGV: job key prefix, worker id, started_at (rfc3339), lease deadline (ms).
/// Returns the job hash as a flat field/value array, or nil.
pub const CLAIM: &str = r#"
while true do
  local id = redis.call('LPOP', KEYS[1])
  if not id then
    return nil
  end
  local key = ARGV[1] .. id
  if redis.call('EXISTS', key) == 1 then
    redis.call('HSET', key,
      'status', 'active',
      'worker_id', ARGV[2],
      'started_at', ARGV[3],
      'lease_expires_at', ARGV[4])
    redis.call('HINCRBY', key, 'attempts_made', 1)
    redis.call('ZADD', KEYS[2], ARGV[4], id)
    return redis.call('HGETALL', key)
  end
end
"#;

/// Move an active job to a terminal list.
///
/// KEYS: job hash, active zset, target list.
/// ARGV: worker id, new status, result field, result value, finished_at, job id.
/// Returns 1 settled, 0 already terminal, -1 not found, -2 stale claim.
pub const SETTLE: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return -1
end
local status = redis.call('HGET', KEYS[1], 'status')
if status == 'completed' or status == 'failed' then
  return 0
end
if status ~= 'active' or redis.call('HGET', KEYS[1], 'worker_id') ~= ARGV[1] then
  return -2
end
redis.call('ZREM', KEYS[2], ARGV[6])
redis.call('HSET', KEYS[1], 'status', ARGV[2], ARGV[3], ARGV[4], 'finished_at', ARGV[5])
redis.call('HDEL', KEYS[1], 'lease_expires_at')
redis.call('RPUSH', KEYS[3], ARGV[6])
return 1
"#;

/// Hand an active job back to the tail of the waiting list.
///
/// KEYS: job hash, active zset, waiting list.
/// ARGV: worker id, error message, job id.
/// Same return codes as `SETTLE`.
pub const RELEASE: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return -1
end
local status = redis.call('HGET', KEYS[1], 'status')
if status == 'completed' or status == 'failed' then
  return 0
end
if status ~= 'active' or redis.call('HGET', KEYS[1], 'worker_id') ~= ARGV[1] then
  return -2
end
redis.call('ZREM', KEYS[2], ARGV[3])
redis.call('HSET', KEYS[1], 'status', 'waiting', 'last_error', ARGV[2])
redis.call('HDEL', KEYS[1], 'worker_id', 'lease_expires_at')
redis.call('RPUSH', KEYS[3], ARGV[3])
return 1
"#;

/// Revert active jobs whose lease deadline passed.
///
/// KEYS: active zset, waiting list, failed list.
/// ARGV: job key prefix, now (ms), finished_at (rfc3339).
/// Returns `{requeued_ids, failed_ids}`.
pub const REAP: &str = r#"
local expired = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[2])
local requeued = {}
local failed = {}
for i = #expired, 1, -1 do
  local id = expired[i]
  local key = ARGV[1] .. id
  redis.call('ZREM', KEYS[1], id)
  if redis.call('EXISTS', key) == 1 then
    local attempts = tonumber(redis.call('HGET', key, 'attempts_made') or '0')
    local cap = tonumber(redis.call('HGET', key, 'max_attempts') or '1')
    redis.call('HDEL', key, 'lease_expires_at')
    if attempts < cap then
      redis.call('HSET', key, 'status', 'waiting')
      redis.call('HDEL', key, 'worker_id')
      redis.call('LPUSH', KEYS[2], id)
      table.insert(requeued, id)
    else
      redis.call('HSET', key,
        'status', 'failed',
        'failure_reason', 'job exceeded max attempts (' .. cap .. ') without settling',
        'finished_at', ARGV[3])
      redis.call('RPUSH', KEYS[3], id)
      table.insert(failed, id)
    end
  end
end
return {requeued, failed}
"#;

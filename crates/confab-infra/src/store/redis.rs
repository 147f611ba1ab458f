//! Redis-backed session store.
//!
//! Sessions are hashes, locks are plain string keys written with `SET NX PX`
//! so the lease expires server-side even if the holder dies. Lock release is
//! a compare-and-delete Lua script, atomic on the server, keyed on the
//! holder token.
//!
//! [`ConnectionManager`] multiplexes one connection and reconnects on its
//! own; cloning it is cheap and every operation clones rather than locking.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ExistenceCheck, Script, SetExpiry, SetOptions};

use confab_core::session::store::SessionStore;
use confab_types::error::StoreError;

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
    release: Script,
}

impl RedisSessionStore {
    /// Connect to the Redis instance at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            manager,
            release: Script::new(RELEASE_SCRIPT),
        })
    }
}

fn op_err(e: redis::RedisError) -> StoreError {
    StoreError::Operation(e.to_string())
}

impl SessionStore for RedisSessionStore {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.hget(key, field).await.map_err(op_err)?;
        Ok(value)
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let () = conn.hset_multiple(key, fields).await.map_err(op_err)?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: bool = conn
            .pexpire(key, ttl.as_millis() as i64)
            .await
            .map_err(op_err)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let exists: bool = conn.exists(key).await.map_err(op_err)?;
        Ok(exists)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.del(key).await.map_err(op_err)?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        lease: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let options = SetOptions::default()
            .conditional_set(ExistenceCheck::NX)
            .with_expiration(SetExpiry::PX(lease.as_millis() as u64));
        // SET NX replies OK on acquisition, nil when the key is held.
        let reply: Option<String> = conn
            .set_options(key, value, options)
            .await
            .map_err(op_err)?;
        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let deleted: i64 = self
            .release
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(op_err)?;
        Ok(deleted == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Connection(format!(
                "unexpected ping reply: {pong}"
            )))
        }
    }
}

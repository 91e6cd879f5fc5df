//! IdGenerator port - ID 生成の抽象化
//!
//! Job ids are assigned by whoever creates the job: the cart service for the
//! first availability check, the worker for the follow-up reservation. Both
//! draw them from this port.
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::JobId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散システムで使える ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数ワーカーから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_job_id(&self) -> JobId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// The time part comes from the injected clock; the random part does not, so
/// two ids generated under a `FixedClock` still differ.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_job_id(&self) -> JobId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        JobId::from(ulid)
    }
}

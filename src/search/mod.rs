//! Contact search - normalization and ranking / 联系人搜索：标准化与排序
//!
//! The pipeline is two pure stages / 两个纯函数阶段：
//! - [`normalizer`]: raw input → comparable forms / 原始输入 → 可比较形式
//! - [`engine`]: comparable forms → ranked results / 可比较形式 → 排序结果
//!
//! Neither stage does I/O; the contact list is indexed once per session and
//! reused for every keystroke. / 两个阶段都无 I/O，索引每会话构建一次。

pub mod engine;
pub mod normalizer;

pub use engine::ContactIndex;
pub use normalizer::{normalize, NormalizedQuery};

//! Search session orchestrator / 搜索会话编排
//!
//! One session = one environment check + one contact load + a stream of
//! debounced inputs. All mutation happens through this module; the display
//! only ever reflects the most recently settled input (generation guard).
//! / 一次会话 = 一次环境检查 + 一次联系人加载 + 一串防抖输入；
//! 展示永远只反映最新一次输入（代际守卫）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use tokio::sync::{broadcast, watch};

use crate::ai::{self, AiTextService};
use crate::config::SearchConfig;
use crate::models::{
    ContactRecord, DisplayEntry, DisplayModel, DisplaySection, Notification, RankedResult,
    RecentEntry, SectionKind,
};
use crate::search::{normalize, ContactIndex};
use crate::source::ContactSource;
use crate::storage::StorageService;
use crate::wechat::{ChatLauncher, EnvironmentProbe, EnvironmentStatus};

/// Session lifecycle phase / 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Initializing,
    /// Terminal until the user remediates externally and rechecks
    /// / 在用户修复环境并重新检查前保持此状态
    EnvironmentCheckFailed,
    Ready,
}

/// Counters for observability and tests / 观测与测试用计数
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Ranking passes actually executed / 实际执行的排序次数
    pub ranking_passes: AtomicU64,
    /// Results dropped by the stale-response guard / 被代际守卫丢弃的结果
    pub stale_drops: AtomicU64,
}

/// Conversational-query heuristic / 会话式查询启发判断
///
/// A pattern list, not a parser — ambiguity is documented behavior.
/// / 关键词启发式，不是解析器。
pub struct IntentClassifier {
    patterns: Vec<Regex>,
}

impl IntentClassifier {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Ignoring invalid intent pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_conversational(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}

struct SessionInner {
    source: Arc<dyn ContactSource>,
    probe: Arc<dyn EnvironmentProbe>,
    launcher: Arc<dyn ChatLauncher>,
    ai: Option<Arc<dyn AiTextService>>,
    storage: StorageService,
    search: SearchConfig,
    classifier: IntentClassifier,

    /// Per-session contact cache, rebuilt wholesale on start/recheck
    /// / 会话级联系人缓存
    index: RwLock<ContactIndex>,
    /// In-memory authority for the pinned list; persistence may lag on write
    /// failure / 置顶列表的内存权威副本
    pinned: RwLock<Vec<ContactRecord>>,
    recent: RwLock<Vec<RecentEntry>>,

    phase: RwLock<SessionPhase>,
    environment: RwLock<EnvironmentStatus>,
    /// Monotonic input generation for debounce + stale guard / 输入代际
    generation: AtomicU64,
    /// Pending quiet-period timer; replaced (and aborted) on new input
    /// / 进行中的防抖定时器，新输入时取消并替换
    debounce: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
    last_query: RwLock<String>,

    display_tx: watch::Sender<DisplayModel>,
    notify_tx: broadcast::Sender<Notification>,
    stats: SessionStats,
}

/// Search session handle; cheap to clone / 搜索会话句柄
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl SearchSession {
    /// Build a session: probe the environment, load contacts and stored
    /// pins/recents, publish the idle display / 构建会话并发布初始展示
    pub async fn start(
        source: Arc<dyn ContactSource>,
        probe: Arc<dyn EnvironmentProbe>,
        launcher: Arc<dyn ChatLauncher>,
        ai: Option<Arc<dyn AiTextService>>,
        storage: StorageService,
        search: SearchConfig,
        intent_patterns: &[String],
    ) -> Self {
        let (display_tx, _) = watch::channel(DisplayModel::default());
        let (notify_tx, _) = broadcast::channel(64);

        let session = Self {
            inner: Arc::new(SessionInner {
                source,
                probe,
                launcher,
                ai,
                storage,
                search,
                classifier: IntentClassifier::new(intent_patterns),
                index: RwLock::new(ContactIndex::build(Vec::new())),
                pinned: RwLock::new(Vec::new()),
                recent: RwLock::new(Vec::new()),
                phase: RwLock::new(SessionPhase::Initializing),
                environment: RwLock::new(EnvironmentStatus::Ready),
                generation: AtomicU64::new(0),
                debounce: parking_lot::Mutex::new(None),
                last_query: RwLock::new(String::new()),
                display_tx,
                notify_tx,
                stats: SessionStats::default(),
            }),
        };

        session.initialize().await;
        session
    }

    async fn initialize(&self) {
        let status = self.inner.probe.check().await;
        *self.inner.environment.write() = status.clone();

        if !status.is_ready() {
            tracing::warn!("Environment not ready: {:?}", status);
            *self.inner.phase.write() = SessionPhase::EnvironmentCheckFailed;
            if let EnvironmentStatus::NotReady { message, .. } = &status {
                self.notify(Notification::failure("Environment not ready", message.clone()));
            }
            return;
        }

        match self.inner.source.load_contacts().await {
            Ok(contacts) => {
                *self.inner.index.write() = ContactIndex::build(contacts);
            }
            Err(e) => {
                // 数据源不可用：本次会话空结果 + 通知 / degraded session
                tracing::error!("Contact load failed: {}", e);
                *self.inner.index.write() = ContactIndex::build(Vec::new());
                self.notify(Notification::failure("Failed to load contacts", e.to_string()));
            }
        }

        *self.inner.pinned.write() = self.inner.storage.get_pinned().await;
        *self.inner.recent.write() = self.inner.storage.get_recent().await;
        *self.inner.phase.write() = SessionPhase::Ready;

        let idle = self.compute_display("");
        self.publish_unconditional(idle);
    }

    /// Re-run the environment check and reload contacts / 重新检查并重载
    pub async fn recheck(&self) -> EnvironmentStatus {
        *self.inner.phase.write() = SessionPhase::Initializing;
        self.initialize().await;
        self.inner.environment.read().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.read()
    }

    pub fn environment(&self) -> EnvironmentStatus {
        self.inner.environment.read().clone()
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.inner.stats.ranking_passes.load(Ordering::Relaxed),
            self.inner.stats.stale_drops.load(Ordering::Relaxed),
        )
    }

    pub fn contact_count(&self) -> usize {
        self.inner.index.read().len()
    }

    /// Look up a cached contact by identifier / 按 ID 查找缓存联系人
    pub fn find_contact(&self, id: &str) -> Option<ContactRecord> {
        self.inner.index.read().records().find(|c| c.id == id).cloned()
    }

    /// Titles of the cached contacts, for AI analysis / 缓存联系人名称
    pub fn contact_titles(&self) -> Vec<String> {
        self.inner
            .index
            .read()
            .records()
            .map(|c| c.display_title().to_string())
            .collect()
    }

    pub fn subscribe_display(&self) -> watch::Receiver<DisplayModel> {
        self.inner.display_tx.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notify_tx.subscribe()
    }

    pub fn pinned(&self) -> Vec<ContactRecord> {
        self.inner.pinned.read().clone()
    }

    pub fn recent(&self) -> Vec<RecentEntry> {
        self.inner.recent.read().clone()
    }

    /// Accept one keystroke's worth of input / 接收一次输入
    ///
    /// Returns immediately; the actual work happens after the debounce quiet
    /// period, and only if no newer input arrived meanwhile.
    /// / 立即返回，静默期后只有最新输入会被处理。
    pub fn submit_input(&self, text: &str) {
        if self.phase() != SessionPhase::Ready {
            tracing::debug!("Input ignored, session not ready");
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = self.clone();
        let text = text.to_string();
        let quiet = std::time::Duration::from_millis(session.inner.search.debounce_ms);

        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if session.inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            // 静默期结束后派发工作与定时器脱钩，之后的取消只靠代际守卫
            // / past the quiet period the work detaches; staleness is handled
            // by the generation guard, in-flight AI calls are never aborted
            let settled = session.clone();
            tokio::spawn(async move {
                settled.dispatch(text, generation).await;
            });
        });

        // 新输入取消并替换旧定时器 / cancel and replace the previous timer
        if let Some(previous) = self.inner.debounce.lock().replace(timer) {
            previous.abort();
        }
    }

    async fn dispatch(&self, text: String, generation: u64) {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            let idle = self.compute_display("");
            self.publish(generation, idle);
            return;
        }

        let conversational = self.inner.classifier.is_conversational(trimmed);
        if conversational {
            if let Some(ai) = self.inner.ai.clone() {
                self.extract_and_search(ai, trimmed.to_string(), generation)
                    .await;
                return;
            }
            // AI 未配置则按字面处理 / literal fallback when AI is off
            tracing::debug!("Conversational input without AI, searching literally");
        }

        self.run_search(trimmed, generation);
    }

    /// AI branch: extraction runs independently of the literal path and its
    /// result is discarded when stale / AI 分支独立运行，过期结果丢弃
    async fn extract_and_search(
        &self,
        ai: Arc<dyn AiTextService>,
        text: String,
        generation: u64,
    ) {
        // 提取期间展示加载状态 / show the loading flag while extracting
        let mut loading = self.compute_display(&self.inner.last_query.read().clone());
        loading.loading = true;
        self.publish(generation, loading);
        self.notify(Notification {
            style: crate::models::NotificationStyle::Animated,
            title: "AI Search".to_string(),
            message: None,
        });

        match ai::extract_contact_keyword(ai.as_ref(), &text).await {
            Ok(Some(keyword)) => {
                if self.is_stale(generation) {
                    self.inner.stats.stale_drops.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Stale AI keyword discarded: {}", keyword);
                    return;
                }
                self.notify(Notification::success("AI Search", format!("Search: \"{}\"", keyword)));
                self.run_search(&keyword, generation);
            }
            Ok(None) => {
                if self.is_stale(generation) {
                    self.inner.stats.stale_drops.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                self.notify(Notification::failure("AI Search", "请输入和联系人相关的问题"));
                self.run_search(&text, generation);
            }
            Err(e) => {
                if self.is_stale(generation) {
                    self.inner.stats.stale_drops.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                // AI 失败不影响字面搜索 / literal search survives AI failure
                self.notify(Notification::failure("AI handling failure", e.to_string()));
                self.run_search(&text, generation);
            }
        }
    }

    fn run_search(&self, query_text: &str, generation: u64) {
        let query = normalize(query_text);
        let ranked = self.inner.index.read().rank(
            &query,
            self.inner.search.score_threshold,
            self.inner.search.max_results,
        );
        self.inner
            .stats
            .ranking_passes
            .fetch_add(1, Ordering::Relaxed);

        let model = merge_display(
            query_text,
            &self.inner.pinned.read(),
            &self.inner.recent.read(),
            &ranked,
        );
        self.publish(generation, model);
    }

    /// One-shot search for the stateless API path / 无状态一次性搜索
    pub fn display_for(&self, query_text: &str) -> DisplayModel {
        let query = normalize(query_text);
        let ranked = self.inner.index.read().rank(
            &query,
            self.inner.search.score_threshold,
            self.inner.search.max_results,
        );
        self.inner
            .stats
            .ranking_passes
            .fetch_add(1, Ordering::Relaxed);
        merge_display(
            query_text,
            &self.inner.pinned.read(),
            &self.inner.recent.read(),
            &ranked,
        )
    }

    /// Pin or unpin a contact / 置顶或取消置顶
    ///
    /// The in-memory list is the display authority and is updated first; a
    /// failed persist keeps it and surfaces a notification (no rollback).
    /// / 先改内存再持久化，写失败不回滚只通知。
    pub async fn toggle_pin(&self, contact: &ContactRecord) -> Vec<ContactRecord> {
        let updated = {
            let mut pinned = self.inner.pinned.write();
            let before = pinned.len();
            pinned.retain(|c| c.id != contact.id);
            if pinned.len() == before {
                // 新置顶追加到末尾 / new pins append
                pinned.push(contact.clone());
            }
            pinned.clone()
        };

        if let Err(e) = self.inner.storage.set_pinned(&updated).await {
            tracing::error!("Pin persist failed: {}", e);
            self.notify(Notification::failure("Failed to save pins", e.to_string()));
        }

        self.republish().await;
        updated
    }

    /// Launch a chat and record the contact / 启动会话并记录历史
    pub async fn launch_chat(&self, contact: &ContactRecord) -> Result<(), crate::error::LaunchError> {
        if let Err(e) = self.inner.launcher.start_chat(&contact.id).await {
            self.notify(Notification::failure("Failed to open chat", e.to_string()));
            return Err(e);
        }

        match self.inner.storage.add_recent(contact).await {
            Ok(entries) => *self.inner.recent.write() = entries,
            Err(e) => {
                tracing::error!("Recency persist failed: {}", e);
                self.notify(Notification::failure(
                    "Failed to record recent contact",
                    e.to_string(),
                ));
            }
        }

        self.republish().await;
        Ok(())
    }

    /// Clear the recency log / 清除搜索历史
    pub async fn clear_recent(&self) {
        match self.inner.storage.clear_recent().await {
            Ok(()) => {
                self.inner.recent.write().clear();
                self.notify(Notification::success("History cleared", ""));
            }
            Err(e) => {
                self.notify(Notification::failure("Failed to clear history", e.to_string()));
            }
        }
        self.republish().await;
    }

    /// Recompute the display for the last settled query / 按最近查询重算展示
    async fn republish(&self) {
        let query = self.inner.last_query.read().clone();
        let model = self.compute_display(&query);
        self.publish_unconditional(model);
    }

    fn compute_display(&self, query_text: &str) -> DisplayModel {
        let query = normalize(query_text);
        let ranked = if query.is_empty() {
            Vec::new()
        } else {
            self.inner.index.read().rank(
                &query,
                self.inner.search.score_threshold,
                self.inner.search.max_results,
            )
        };
        merge_display(
            query_text,
            &self.inner.pinned.read(),
            &self.inner.recent.read(),
            &ranked,
        )
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) != generation
    }

    /// Publish unless a newer input settled meanwhile / 发布前检查代际
    fn publish(&self, generation: u64, model: DisplayModel) {
        if self.is_stale(generation) {
            self.inner.stats.stale_drops.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.publish_unconditional(model);
    }

    fn publish_unconditional(&self, model: DisplayModel) {
        *self.inner.last_query.write() = model.query.clone();
        self.inner.display_tx.send_replace(model);
    }

    fn notify(&self, notification: Notification) {
        // 没有订阅者也无妨 / fine with no subscribers
        let _ = self.inner.notify_tx.send(notification);
    }
}

/// Merge pinned, recent and ranked results into the presented list
/// / 合并置顶、历史与搜索结果
///
/// Pure function. Pinned contacts are suppressed from the other sections so
/// nothing shows twice; the recent section only appears while the query is
/// empty, matching the launcher's presentation.
/// / 纯函数；置顶项不在其他分区重复出现；历史分区只在空查询时展示。
pub fn merge_display(
    query: &str,
    pinned: &[ContactRecord],
    recent: &[RecentEntry],
    ranked: &[RankedResult],
) -> DisplayModel {
    let mut sections = Vec::new();

    if !pinned.is_empty() {
        sections.push(DisplaySection {
            kind: SectionKind::Pinned,
            entries: pinned
                .iter()
                .map(|c| DisplayEntry {
                    contact: c.clone(),
                    pinned: true,
                    matched_field: None,
                })
                .collect(),
        });
    }

    let is_pinned = |id: &str| pinned.iter().any(|p| p.id == id);

    if query.trim().is_empty() {
        let entries: Vec<DisplayEntry> = recent
            .iter()
            .filter(|e| !is_pinned(&e.contact.id))
            .map(|e| DisplayEntry {
                contact: e.contact.clone(),
                pinned: false,
                matched_field: None,
            })
            .collect();
        if !entries.is_empty() {
            sections.push(DisplaySection {
                kind: SectionKind::Recent,
                entries,
            });
        }
    } else {
        let entries: Vec<DisplayEntry> = ranked
            .iter()
            .filter(|r| !is_pinned(&r.contact.id))
            .map(|r| DisplayEntry {
                contact: r.contact.clone(),
                pinned: false,
                matched_field: Some(r.matched_field),
            })
            .collect();
        sections.push(DisplaySection {
            kind: SectionKind::Contacts,
            entries,
        });
    }

    DisplayModel {
        query: query.to_string(),
        sections,
        loading: false,
    }
}

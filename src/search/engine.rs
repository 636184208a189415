//! Ranking engine - scores contacts against a normalized query / 排序引擎
//!
//! Architecture principle: only expose primitive operations, no control flow
//! / 架构原则：只暴露原语操作，不控制流程
//! - build: index a contact list / 构建联系人索引
//! - rank: score + sort + threshold / 打分、排序、过滤
//!
//! Match classes, best to worst / 命中等级，从高到低：
//! literal prefix > literal substring > pinyin prefix > fuzzy subsequence >
//! pinyin substring > initial prefix > initial substring

use std::collections::HashSet;

use crate::models::{ContactRecord, MatchClass, MatchField, RankedResult};

use super::normalizer::{fold, pinyin_forms, NormalizedQuery, PinyinForms};

/// Class base scores. Separated by more than the maximum intra-class bonus,
/// so classes never interleave. / 等级基准分，间隔大于类内加成上限。
const SCORE_PREFIX: f32 = 100.0;
const SCORE_SUBSTRING: f32 = 88.0;
const SCORE_PINYIN_PREFIX: f32 = 76.0;
const SCORE_SUBSEQUENCE: f32 = 64.0;
const SCORE_PINYIN_SUBSTRING: f32 = 52.0;
const SCORE_INITIAL_PREFIX: f32 = 44.0;
const SCORE_INITIAL_SUBSTRING: f32 = 36.0;

/// Maximum intra-class bonus / 类内加成上限
const MAX_BONUS: f32 = 7.0;
/// Bonus for a pinyin prefix that consumes whole syllables / 音节对齐加成
const SYLLABLE_BONUS: f32 = 3.0;
/// Fuzzy subsequence needs at least this many query chars / 模糊匹配最短长度
const MIN_SUBSEQUENCE_LEN: usize = 2;

/// One searchable field of a contact / 联系人的一个可搜索字段
struct FieldIndex {
    field: MatchField,
    /// Folded literal form / 折叠后的字面形式
    literal: String,
    literal_chars: usize,
    /// Pinyin forms, present when the field contains Han text / 拼音形式
    pinyin: Option<PinyinForms>,
}

impl FieldIndex {
    fn new(field: MatchField, text: &str) -> Self {
        let literal = fold(text);
        let literal_chars = literal.chars().count();
        let pinyin = pinyin_forms(text);
        Self {
            field,
            literal,
            literal_chars,
            pinyin,
        }
    }
}

/// A contact plus its precomputed comparable forms / 联系人及其预计算形式
struct IndexedContact {
    record: ContactRecord,
    fields: Vec<FieldIndex>,
}

/// In-memory contact index, rebuilt wholesale per session / 内存联系人索引
///
/// The index preserves source order; ties in ranking fall back to it, so
/// identical input always produces identical output. / 保留原始顺序，
/// 同分结果按原始顺序稳定排序。
pub struct ContactIndex {
    contacts: Vec<IndexedContact>,
}

impl ContactIndex {
    /// Build the index; duplicate identifiers keep the first occurrence
    /// / 构建索引，重复 ID 保留首个
    pub fn build(records: Vec<ContactRecord>) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut contacts = Vec::with_capacity(records.len());

        for record in records {
            if !seen.insert(record.id.clone()) {
                tracing::debug!("Duplicate contact id skipped: {}", record.id);
                continue;
            }

            let mut fields = vec![FieldIndex::new(MatchField::Title, &record.title)];
            if let Some(subtitle) = record.subtitle.as_deref() {
                if !subtitle.is_empty() {
                    fields.push(FieldIndex::new(MatchField::Subtitle, subtitle));
                }
            }
            fields.push(FieldIndex::new(MatchField::Id, &record.id));

            contacts.push(IndexedContact { record, fields });
        }

        Self { contacts }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Contacts in original cache order / 按原始顺序访问联系人
    pub fn records(&self) -> impl Iterator<Item = &ContactRecord> {
        self.contacts.iter().map(|c| &c.record)
    }

    /// Rank contacts against a normalized query / 对查询打分排序
    ///
    /// Empty query returns an empty vec — the caller decides what to show
    /// instead. A query matching nothing is an empty vec too, never an
    /// error. / 空查询返回空结果，由调用方决定展示内容。
    pub fn rank(
        &self,
        query: &NormalizedQuery,
        threshold: f32,
        limit: usize,
    ) -> Vec<RankedResult> {
        if query.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<RankedResult> = Vec::new();

        for indexed in &self.contacts {
            let mut best: Option<(f32, MatchField, MatchClass)> = None;
            for field_index in &indexed.fields {
                if let Some((score, class)) = score_field(field_index, query) {
                    let better = match best {
                        Some((prev, _, _)) => score > prev,
                        None => true,
                    };
                    if better {
                        best = Some((score, field_index.field, class));
                    }
                }
            }

            if let Some((score, matched_field, match_class)) = best {
                if score >= threshold {
                    results.push(RankedResult {
                        contact: indexed.record.clone(),
                        score,
                        matched_field,
                        match_class,
                    });
                }
            }
        }

        // 按分数排序；sort_by 是稳定排序，同分保持原始顺序
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        results
    }
}

/// Score one field against the query; first hit in ladder order wins because
/// class gaps exceed the bonus cap / 按等级顺序打分，首个命中即最高
fn score_field(field: &FieldIndex, query: &NormalizedQuery) -> Option<(f32, MatchClass)> {
    let literal = &query.literal;
    let query_chars = literal.chars().count();

    if field.literal.starts_with(literal.as_str()) {
        let score = SCORE_PREFIX + length_bonus(query_chars, field.literal_chars, MAX_BONUS);
        return Some((score, MatchClass::Prefix));
    }

    if field.literal.contains(literal.as_str()) {
        let score = SCORE_SUBSTRING + length_bonus(query_chars, field.literal_chars, MAX_BONUS);
        return Some((score, MatchClass::Substring));
    }

    // 拼音等级只对纯 ASCII 查询开放 / pinyin ladder only for ASCII queries
    let ascii = query.ascii();

    if let (Some(ascii), Some(pinyin)) = (ascii, field.pinyin.as_ref()) {
        if pinyin.full.starts_with(ascii) {
            // 止于音节边界的前缀额外加分，"li" 对 lijianguo 优于 liufang
            let aligned = pinyin.syllable_ends.contains(&ascii.len());
            let mut score = SCORE_PINYIN_PREFIX
                + length_bonus(ascii.len(), pinyin.full.len(), MAX_BONUS - SYLLABLE_BONUS);
            if aligned {
                score += SYLLABLE_BONUS;
            }
            return Some((score, MatchClass::PinyinPrefix));
        }
    }

    if query_chars >= MIN_SUBSEQUENCE_LEN && is_subsequence(literal, &field.literal) {
        let score = SCORE_SUBSEQUENCE + length_bonus(query_chars, field.literal_chars, MAX_BONUS);
        return Some((score, MatchClass::Subsequence));
    }

    if let (Some(ascii), Some(pinyin)) = (ascii, field.pinyin.as_ref()) {
        if pinyin.full.contains(ascii) {
            let score =
                SCORE_PINYIN_SUBSTRING + length_bonus(ascii.len(), pinyin.full.len(), MAX_BONUS);
            return Some((score, MatchClass::PinyinSubstring));
        }

        if pinyin.initials.starts_with(ascii) {
            let score =
                SCORE_INITIAL_PREFIX + length_bonus(ascii.len(), pinyin.initials.len(), MAX_BONUS);
            return Some((score, MatchClass::PinyinInitial));
        }

        if pinyin.initials.contains(ascii) {
            let score = SCORE_INITIAL_SUBSTRING
                + length_bonus(ascii.len(), pinyin.initials.len(), MAX_BONUS);
            return Some((score, MatchClass::PinyinInitial));
        }
    }

    None
}

/// Longer coverage of the field scores higher within a class / 类内长度加成
fn length_bonus(query_len: usize, field_len: usize, cap: f32) -> f32 {
    if field_len == 0 {
        return 0.0;
    }
    (query_len as f32 / field_len as f32 * cap).min(cap)
}

/// Check query chars appear in order inside the field / 子序列判定
fn is_subsequence(query: &str, field: &str) -> bool {
    let mut field_chars = field.chars();
    'outer: for qc in query.chars() {
        for fc in field_chars.by_ref() {
            if fc == qc {
                continue 'outer;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::normalizer::normalize;

    fn contact(id: &str, title: &str) -> ContactRecord {
        ContactRecord {
            id: id.to_string(),
            title: title.to_string(),
            subtitle: None,
            icon: None,
            url: format!("weisou://chat/{}", id),
        }
    }

    fn index(contacts: Vec<ContactRecord>) -> ContactIndex {
        ContactIndex::build(contacts)
    }

    fn rank(index: &ContactIndex, query: &str) -> Vec<RankedResult> {
        index.rank(&normalize(query), 30.0, 50)
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let idx = index(vec![contact("wx_a", "Alice")]);
        assert!(rank(&idx, "").is_empty());
        assert!(rank(&idx, "   ").is_empty());
    }

    #[test]
    fn test_no_match_returns_empty_not_error() {
        let idx = index(vec![contact("wx_a", "Alice"), contact("wx_b", "Bob")]);
        assert!(rank(&idx, "zzzz").is_empty());
    }

    #[test]
    fn test_prefix_outranks_substring() {
        let idx = index(vec![
            contact("wx_1", "pineapple"),
            contact("wx_2", "apple"),
        ]);
        let results = rank(&idx, "app");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].contact.id, "wx_2");
        assert_eq!(results[0].match_class, MatchClass::Prefix);
        assert_eq!(results[1].match_class, MatchClass::Substring);
    }

    #[test]
    fn test_substring_outranks_subsequence() {
        let idx = index(vec![
            contact("wx_1", "pxlxy"), // "pl" 子序列 / subsequence only
            contact("wx_2", "xxplxx"), // "pl" 子串 / substring
        ]);
        let results = rank(&idx, "pl");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].contact.id, "wx_2");
        assert_eq!(results[1].match_class, MatchClass::Subsequence);
    }

    #[test]
    fn test_pinyin_prefix_match() {
        // 规格场景：query "li" → 李建国 在 刘芳 之上
        let idx = index(vec![
            contact("wx_li", "李建国"),
            contact("wx_liu", "刘芳"),
        ]);
        let results = rank(&idx, "li");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].contact.id, "wx_li");
        assert_eq!(results[0].match_class, MatchClass::PinyinPrefix);
    }

    #[test]
    fn test_pinyin_initials_match() {
        let idx = index(vec![
            contact("wx_li", "李建国"),
            contact("wx_liu", "刘芳"),
        ]);
        let results = rank(&idx, "ljg");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].contact.id, "wx_li");
        assert_eq!(results[0].match_class, MatchClass::PinyinInitial);
    }

    #[test]
    fn test_han_query_matches_literally() {
        let idx = index(vec![
            contact("wx_li", "李建国"),
            contact("wx_liu", "刘芳"),
        ]);
        let results = rank(&idx, "建国");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].contact.id, "wx_li");
        assert_eq!(results[0].match_class, MatchClass::Substring);
    }

    #[test]
    fn test_subtitle_and_id_fields_match() {
        let mut c = contact("wx_laowang", "王强");
        c.subtitle = Some("隔壁老王".to_string());
        let idx = index(vec![c]);

        let by_subtitle = rank(&idx, "老王");
        assert_eq!(by_subtitle.len(), 1);
        assert_eq!(by_subtitle[0].matched_field, MatchField::Subtitle);

        let by_id = rank(&idx, "wx_laowang");
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].matched_field, MatchField::Id);
    }

    #[test]
    fn test_sorted_descending_and_deterministic() {
        let contacts = vec![
            contact("wx_1", "张伟"),
            contact("wx_2", "张丽"),
            contact("wx_3", "章子怡"),
            contact("wx_4", "zhang san"),
        ];
        let idx = index(contacts.clone());
        let first = rank(&idx, "zhang");
        for pair in first.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // 相同输入输出确定 / identical input, identical output
        let second = rank(&idx, "zhang");
        let ids: Vec<&str> = first.iter().map(|r| r.contact.id.as_str()).collect();
        let ids2: Vec<&str> = second.iter().map(|r| r.contact.id.as_str()).collect();
        assert_eq!(ids, ids2);
    }

    #[test]
    fn test_stable_tiebreak_by_source_order() {
        // 两个同名联系人同分，保持缓存顺序 / equal scores keep cache order
        let idx = index(vec![
            contact("wx_first", "李雷"),
            contact("wx_second", "李雷"),
        ]);
        let results = rank(&idx, "李雷");
        assert_eq!(results[0].contact.id, "wx_first");
        assert_eq!(results[1].contact.id, "wx_second");
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn test_threshold_filters_weak_matches() {
        let idx = index(vec![contact("wx_1", "李建国")]);
        // 高阈值下首字母命中被过滤 / initials hit dies under a high threshold
        let results = idx.rank(&normalize("ljg"), 90.0, 50);
        assert!(results.is_empty());
    }

    #[test]
    fn test_duplicate_ids_deduplicated() {
        let idx = index(vec![
            contact("wx_dup", "张伟"),
            contact("wx_dup", "张伟(2)"),
        ]);
        assert_eq!(idx.len(), 1);
        let results = rank(&idx, "张伟");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].contact.title, "张伟");
    }

    #[test]
    fn test_limit_truncates() {
        let contacts: Vec<ContactRecord> = (0..20)
            .map(|i| contact(&format!("wx_{}", i), &format!("李雷{}", i)))
            .collect();
        let idx = index(contacts);
        let results = idx.rank(&normalize("李雷"), 30.0, 5);
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_single_char_query_needs_direct_hit() {
        // 单字符不做子序列匹配 / no subsequence for single-char queries
        let idx = index(vec![contact("wx_1", "axxx")]);
        let results = rank(&idx, "x");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_class, MatchClass::Substring);

        let idx2 = index(vec![contact("wx_2", "abcd")]);
        assert!(rank(&idx2, "d").len() == 1); // 子串仍命中 / substring still hits
    }
}

//! Query normalizer - derives comparable forms from raw text / 查询标准化
//!
//! Supports / 支持：
//! - Literal form (trimmed + lowercased) / 字面形式
//! - Pinyin transliteration of Han text (full + initials) / 拼音音译
//! - Traditional→simplified folding for common name characters / 简繁折叠

use pinyin::ToPinyin;

/// The comparable forms derived from raw user input / 用户输入的可比较形式
///
/// Recomputed per keystroke, never persisted. Pure data — an empty literal
/// matches nothing and the caller short-circuits to pinned/recent display.
/// / 每次按键重新计算，不持久化。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    /// Original input, untrimmed / 原始输入
    pub raw: String,
    /// Trimmed, lowercased, simplified-folded literal / 标准化字面形式
    pub literal: String,
}

impl NormalizedQuery {
    pub fn is_empty(&self) -> bool {
        self.literal.is_empty()
    }

    /// The form compared against pinyin variants, when one exists
    /// / 与拼音形式比较时使用的形式
    ///
    /// Only a pure ASCII alphanumeric query can match a transliteration.
    pub fn ascii(&self) -> Option<&str> {
        if !self.literal.is_empty()
            && self.literal.chars().all(|c| c.is_ascii_alphanumeric())
        {
            Some(&self.literal)
        } else {
            None
        }
    }
}

/// Normalize raw user input / 标准化用户输入
///
/// No I/O, no failure modes. / 纯函数，无副作用。
pub fn normalize(raw: &str) -> NormalizedQuery {
    let literal = fold(raw.trim());
    NormalizedQuery {
        raw: raw.to_string(),
        literal,
    }
}

/// Lowercase + simplified fold, applied to queries and contact fields alike
/// so both sides compare in the same space / 查询与联系人字段共用的折叠
pub fn fold(text: &str) -> String {
    text.chars()
        .map(|c| to_simplified_char(c))
        .collect::<String>()
        .to_lowercase()
}

/// Check if text contains Han characters / 检测文本是否包含汉字
pub fn contains_han(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}'))
}

/// Pinyin transliteration of a contact field / 字段的拼音形式
#[derive(Debug, Clone, PartialEq)]
pub struct PinyinForms {
    /// Concatenated full pinyin, e.g. "lijianguo" / 全拼
    pub full: String,
    /// Initial letters, e.g. "ljg" / 首字母
    pub initials: String,
    /// Byte offset in `full` after each syllable; a query prefix ending on
    /// one of these offsets consumed whole syllables / 每个音节结束处的字节偏移
    pub syllable_ends: Vec<usize>,
}

/// Pinyin forms of a contact field / 计算字段的拼音形式
///
/// Latin letters and digits inside mixed text are carried through both forms
/// (each counts as its own syllable); returns None when the text contains no
/// Han character at all (the literal forms already cover it).
/// / 混排的拉丁字符原样并入；无汉字时返回 None。
pub fn pinyin_forms(text: &str) -> Option<PinyinForms> {
    let folded = fold(text);
    let mut full = String::new();
    let mut initials = String::new();
    let mut syllable_ends = Vec::new();
    let mut has_han = false;

    for (ch, py) in folded.chars().zip(folded.as_str().to_pinyin()) {
        match py {
            Some(p) => {
                has_han = true;
                full.push_str(p.plain());
                initials.push_str(p.first_letter());
                syllable_ends.push(full.len());
            }
            None => {
                if ch.is_ascii_alphanumeric() {
                    full.push(ch);
                    initials.push(ch);
                    syllable_ends.push(full.len());
                }
            }
        }
    }

    if has_han {
        Some(PinyinForms {
            full,
            initials,
            syllable_ends,
        })
    } else {
        None
    }
}

/// 繁体转简体（常见姓名用字映射）
///
/// Contact titles occasionally arrive in traditional form (Hong Kong/Taiwan
/// accounts); fold the characters that actually occur in names so both
/// literal and pinyin comparison see one script.
fn to_simplified_char(c: char) -> char {
    match c {
        // 常见姓氏 / common surnames
        '劉' => '刘', '陳' => '陈', '張' => '张', '楊' => '杨', '黃' => '黄',
        '趙' => '赵', '吳' => '吴', '孫' => '孙', '馬' => '马', '羅' => '罗',
        '鄭' => '郑', '謝' => '谢', '許' => '许', '鄧' => '邓', '馮' => '冯',
        '韓' => '韩', '蕭' => '萧', '葉' => '叶', '蔣' => '蒋', '蘇' => '苏',
        '呂' => '吕', '盧' => '卢', '鐘' => '钟', '譚' => '谭', '陸' => '陆',
        '賈' => '贾', '韋' => '韦', '鄒' => '邹', '閻' => '阎', '龍' => '龙',
        '賀' => '贺', '顧' => '顾', '龔' => '龚', '萬' => '万', '錢' => '钱',
        '嚴' => '严', '賴' => '赖', '樑' => '梁', '範' => '范',
        // 常见名字用字 / common given-name characters
        '國' => '国', '華' => '华', '偉' => '伟', '軍' => '军', '強' => '强',
        '東' => '东', '雲' => '云', '鵬' => '鹏', '飛' => '飞', '榮' => '荣',
        '興' => '兴', '慶' => '庆', '靜' => '静', '麗' => '丽', '紅' => '红',
        '鳳' => '凤', '艷' => '艳', '潔' => '洁', '綱' => '纲', '維' => '维',
        '學' => '学', '寶' => '宝', '義' => '义', '禮' => '礼', '愛' => '爱',
        '樂' => '乐', '廣' => '广', '亞' => '亚', '歡' => '欢', '陽' => '阳',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let q = normalize("  LiJianGuo  ");
        assert_eq!(q.literal, "lijianguo");
        assert_eq!(q.ascii(), Some("lijianguo"));
    }

    #[test]
    fn test_empty_input_matches_nothing() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
    }

    #[test]
    fn test_han_query_has_no_ascii_form() {
        let q = normalize("李建国");
        assert!(!q.is_empty());
        assert_eq!(q.ascii(), None);
    }

    #[test]
    fn test_pinyin_forms() {
        let forms = pinyin_forms("李建国").unwrap();
        assert_eq!(forms.full, "lijianguo");
        assert_eq!(forms.initials, "ljg");
        // "li" 止于音节边界，"lij" 不是 / "li" ends on a syllable boundary
        assert!(forms.syllable_ends.contains(&2));
        assert!(!forms.syllable_ends.contains(&3));
    }

    #[test]
    fn test_pinyin_forms_mixed_text() {
        let forms = pinyin_forms("阿Ken李").unwrap();
        assert_eq!(forms.full, "akenli");
        assert_eq!(forms.initials, "akenl");
    }

    #[test]
    fn test_latin_only_has_no_pinyin() {
        assert!(pinyin_forms("alice").is_none());
    }

    #[test]
    fn test_traditional_folds_to_simplified() {
        assert_eq!(fold("劉芳"), "刘芳");
        assert_eq!(pinyin_forms("劉芳").unwrap().full, "liufang");
    }

    #[test]
    fn test_contains_han() {
        assert!(contains_han("李建国"));
        assert!(contains_han("test李"));
        assert!(!contains_han("test"));
    }
}

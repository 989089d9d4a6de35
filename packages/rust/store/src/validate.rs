//! Pre-write completeness check.
//!
//! Every stored entry must carry all eight fields below. A record missing any
//! of them is skipped rather than written half-empty.

use trendbrief_shared::{ProcessedRecord, is_blank};

/// Shown in reports for a record that has no identifier at all.
const UNKNOWN_NAME: &str = "未知";

/// A field every stored entry must have. Display names double as the store's
/// property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    Name,
    OneLiner,
    Value,
    Audience,
    Url,
    Tags,
    Xiaohongshu,
    Wechat,
}

impl RequiredField {
    /// All required fields, in report order.
    pub const ALL: [Self; 8] = [
        Self::Name,
        Self::OneLiner,
        Self::Value,
        Self::Audience,
        Self::Url,
        Self::Tags,
        Self::Xiaohongshu,
        Self::Wechat,
    ];

    /// Human-readable name, also the store property name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Name => "名称",
            Self::OneLiner => "一句话简介",
            Self::Value => "使用价值",
            Self::Audience => "用户群体",
            Self::Url => "Github链接",
            Self::Tags => "标签分类",
            Self::Xiaohongshu => "小红书推广文案",
            Self::Wechat => "公众号推广文案",
        }
    }

    fn value_of<'a>(&self, record: &'a ProcessedRecord) -> &'a str {
        let m = &record.marketing;
        match self {
            Self::Name => record.name(),
            Self::OneLiner => &m.one_liner,
            Self::Value => &m.value,
            Self::Audience => &m.audience,
            Self::Url => &record.candidate().url,
            Self::Tags => &m.tags,
            Self::Xiaohongshu => &m.xiaohongshu,
            Self::Wechat => &m.wechat,
        }
    }

    /// Tags are stored as the split list, so they are missing when no label
    /// survives splitting.
    fn is_missing(&self, record: &ProcessedRecord) -> bool {
        match self {
            Self::Tags => record.marketing.tag_list().is_empty(),
            _ => is_blank(self.value_of(record)),
        }
    }
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Required fields that are empty or whitespace-only in `record`.
///
/// Tags made only of separators count as empty.
pub fn missing_fields(record: &ProcessedRecord) -> Vec<RequiredField> {
    RequiredField::ALL
        .into_iter()
        .filter(|field| field.is_missing(record))
        .collect()
}

/// A record excluded from writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based position in the batch.
    pub index: usize,
    pub name: String,
    pub missing: Vec<RequiredField>,
}

impl SkippedRecord {
    /// Display names of the missing fields.
    pub fn missing_names(&self) -> Vec<&'static str> {
        self.missing.iter().map(RequiredField::display_name).collect()
    }
}

/// Outcome of validating a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub details: Vec<SkippedRecord>,
}

/// Validate every record in `records`.
pub fn validate_all(records: &[ProcessedRecord]) -> ValidationReport {
    let mut report = ValidationReport {
        total: records.len(),
        ..Default::default()
    };

    for (i, record) in records.iter().enumerate() {
        let missing = missing_fields(record);
        if missing.is_empty() {
            report.valid += 1;
            continue;
        }
        report.invalid += 1;
        let name = if is_blank(record.name()) {
            UNKNOWN_NAME.to_string()
        } else {
            record.name().to_string()
        };
        report.details.push(SkippedRecord {
            index: i + 1,
            name,
            missing,
        });
    }

    report
}

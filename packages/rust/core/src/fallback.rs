//! Template content used when the model is unavailable, slow, or unhelpful.
//!
//! Everything here is a pure function of the candidate's own fields, so the
//! same repository always gets the same text.

use trendbrief_shared::{
    CandidateRecord, DEFAULT_DESCRIPTION, MarketingContent, is_blank, truncate_chars,
};

const ONE_LINER_MAX_CHARS: usize = 50;

const EMOJIS: [&str; 6] = ["🔥", "✨", "💡", "🚀", "⭐", "👍"];

/// Audience per primary language.
const AUDIENCES: [(&str, &str); 9] = [
    ("JavaScript", "前端开发者、Node.js 开发者"),
    ("TypeScript", "前端开发者、全栈工程师"),
    ("Python", "Python 开发者、数据科学家"),
    ("Java", "Java 开发者、后端工程师"),
    ("Go", "Go 开发者、云原生工程师"),
    ("Rust", "Rust 开发者、系统程序员"),
    ("C++", "C++ 开发者、游戏开发者"),
    ("Swift", "iOS 开发者、macOS 开发者"),
    ("Kotlin", "Android 开发者、后端工程师"),
];

const DEFAULT_AUDIENCE: &str = "软件开发者、技术爱好者";
const DEFAULT_TAG: &str = "开发工具";

/// All six fields from templates.
pub fn fallback_content(c: &CandidateRecord) -> MarketingContent {
    MarketingContent {
        one_liner: one_liner(c),
        value: value(c),
        audience: audience(c),
        tags: tags(c),
        xiaohongshu: xiaohongshu(c),
        wechat: wechat(c),
    }
}

/// Description, unless the source had none.
fn known_description(c: &CandidateRecord) -> Option<&str> {
    let d = c.description.trim();
    (!d.is_empty() && d != DEFAULT_DESCRIPTION).then_some(d)
}

fn language_or<'a>(c: &'a CandidateRecord, default: &'a str) -> &'a str {
    if c.has_language() { c.language.as_str() } else { default }
}

pub(crate) fn one_liner(c: &CandidateRecord) -> String {
    match known_description(c) {
        Some(d) => truncate_chars(d, ONE_LINER_MAX_CHARS).to_string(),
        None => format!("{} 项目", language_or(c, "开源")),
    }
}

pub(crate) fn value(c: &CandidateRecord) -> String {
    format!(
        "这是一个使用 {} 开发的开源项目，目前已获得 {} 个 Stars。{}适合学习和在项目中使用。",
        language_or(c, "多种语言"),
        c.stars,
        known_description(c).unwrap_or("提供了实用的功能和优秀的代码实现。"),
    )
}

pub(crate) fn audience(c: &CandidateRecord) -> String {
    AUDIENCES
        .iter()
        .find(|(lang, _)| *lang == c.language)
        .map_or(DEFAULT_AUDIENCE, |(_, audience)| *audience)
        .to_string()
}

pub(crate) fn tags(c: &CandidateRecord) -> String {
    language_or(c, DEFAULT_TAG).to_string()
}

/// Emoji picked from the identifier's bytes.
fn emoji_for(name: &str) -> &'static str {
    let sum: usize = name.bytes().map(usize::from).sum();
    EMOJIS[sum % EMOJIS.len()]
}

pub(crate) fn xiaohongshu(c: &CandidateRecord) -> String {
    let built_with = if c.has_language() {
        format!("使用 {} 开发，", c.language)
    } else {
        String::new()
    };
    format!(
        "{} 发现一个超棒的开源项目！\n\n{}\n{}\n\n已经有 {} 个 Star 啦！{}代码质量很高，值得学习和使用～\n\n#GitHub #开源项目 #{}",
        emoji_for(&c.name),
        c.name,
        c.description,
        c.stars,
        built_with,
        language_or(c, "编程"),
    )
}

pub(crate) fn wechat(c: &CandidateRecord) -> String {
    format!(
        "【GitHub 热门项目推荐】\n\n项目名称：{}\n\n{}\n\n该项目使用 {} 开发，目前在 GitHub 上已获得 {} 个 Stars 和 {} 个 Forks，是一个活跃且优质的开源项目。\n\n项目特点：代码结构清晰、文档完善、社区活跃。无论是学习还是在实际项目中使用，都是不错的选择。\n\n推荐给对 {} 感兴趣的开发者关注。",
        c.name,
        c.description,
        language_or(c, "多种技术"),
        c.stars,
        c.forks,
        language_or(c, "软件开发"),
    )
}

/// Fill every blank field of `content` from the templates.
///
/// Tags made only of separators count as blank. Returns how many fields had
/// to be filled.
pub fn fill_blanks(content: &mut MarketingContent, c: &CandidateRecord) -> usize {
    if content.tag_list().is_empty() {
        content.tags.clear();
    }

    let fields: [(&mut String, fn(&CandidateRecord) -> String); 6] = [
        (&mut content.one_liner, one_liner),
        (&mut content.value, value),
        (&mut content.audience, audience),
        (&mut content.tags, tags),
        (&mut content.xiaohongshu, xiaohongshu),
        (&mut content.wechat, wechat),
    ];

    let mut filled = 0;
    for (field, template) in fields {
        if is_blank(field) {
            *field = template(c);
            filled += 1;
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rust_repo() -> CandidateRecord {
        let mut c = CandidateRecord::new("astral-sh/ruff");
        c.description = "An extremely fast Python linter and code formatter, written in Rust.".into();
        c.language = "Rust".into();
        c.stars = 35_000;
        c.forks = 1_200;
        c
    }

    #[test]
    fn every_field_is_non_empty_even_for_bare_candidates() {
        let content = fallback_content(&CandidateRecord::new("someone/thing"));
        for field in [
            &content.one_liner,
            &content.value,
            &content.audience,
            &content.tags,
            &content.xiaohongshu,
            &content.wechat,
        ] {
            assert!(!field.trim().is_empty());
        }
        assert_eq!(content.tags, "开发工具");
        assert_eq!(content.audience, "软件开发者、技术爱好者");
        assert_eq!(content.one_liner, "开源 项目");
    }

    #[test]
    fn same_input_same_output() {
        assert_eq!(fallback_content(&rust_repo()), fallback_content(&rust_repo()));
    }

    #[test]
    fn uses_language_table_and_description() {
        let content = fallback_content(&rust_repo());
        assert_eq!(content.audience, "Rust 开发者、系统程序员");
        assert_eq!(content.tags, "Rust");
        assert_eq!(content.one_liner.chars().count(), 50);
        assert!(content.value.contains("使用 Rust 开发"));
        assert!(content.value.contains("35000 个 Stars"));
        assert!(content.wechat.contains("1200 个 Forks"));
        assert!(content.xiaohongshu.ends_with("#Rust"));
        assert!(content.xiaohongshu.contains("使用 Rust 开发，"));
    }

    #[test]
    fn emoji_is_stable_per_identifier() {
        let a = emoji_for("astral-sh/ruff");
        assert_eq!(a, emoji_for("astral-sh/ruff"));
        assert!(EMOJIS.contains(&a));
    }

    #[test]
    fn fill_blanks_only_touches_blank_fields() {
        let mut content = MarketingContent {
            one_liner: "模型写的".into(),
            value: "  ".into(),
            ..Default::default()
        };
        let filled = fill_blanks(&mut content, &rust_repo());
        assert_eq!(filled, 5);
        assert_eq!(content.one_liner, "模型写的");
        assert!(content.value.starts_with("这是一个使用 Rust"));
    }

    #[test]
    fn separator_only_tags_get_template() {
        let mut content = fallback_content(&rust_repo());
        content.tags = " , ，".into();
        assert_eq!(fill_blanks(&mut content, &rust_repo()), 1);
        assert_eq!(content.tags, "Rust");
    }
}

//! Prompt construction and reply parsing for marketing copy generation.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use trendbrief_shared::{EnrichedRecord, MarketingContent, truncate_chars};

/// System role sent with every request.
pub const SYSTEM_PROMPT: &str = "你是一位资深的技术产品分析师和营销专家，擅长深度分析开源项目的技术价值和商业价值，并能用不同风格的语言精准触达目标用户群体。";

/// First `{` through last `}`, across newlines.
static JSON_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json span regex"));

const ANALYSIS_INSTRUCTIONS: &str = r#"## 分析要求

请按照以下步骤进行深度分析，并以 JSON 格式返回结果：

1. **一句话简介** (oneLiner)
   - 20字以内
   - 高度概括项目的核心价值
   - 让人一眼就懂这是什么

2. **使用价值** (value)
   - 150-200字
   - 基于 README 内容深度分析项目的核心功能
   - 明确指出适合在哪些领域和项目中使用
   - 说明能解决什么具体问题
   - 强调技术优势和实际应用场景
   - 如果没有 README，基于项目名称和描述推断

3. **用户群体** (audience)
   - 50-80字
   - 基于使用价值，精准定位目标用户
   - 特别关注：创业者（技术创业者、产品创业者）和工程开发人员（前端、后端、全栈、AI 工程师等）
   - 说明什么类型的创业者或开发者最需要这个工具
   - 例如："适合构建 SaaS 产品的技术创业者"、"开发 AI 应用的全栈工程师"

4. **标签分类** (tags)
   - 根据使用价值和用户群体，提取 3-5 个关键标签
   - 用逗号分隔，如：AI工具,开发效率,开源框架
   - 标签要便于分类和检索

5. **小红书推广文案** (xiaohongshu)
   - 150-200字
   - 基于使用价值和用户群体，采用小红书的行文风格
   - 轻松活泼，使用适当的 emoji
   - 突出实用性和易用性
   - 分点列举核心功能
   - 加入话题标签（#开发工具 #AI 等）
   - 面向技术创业者和开发者，但语气要亲和

6. **公众号推广文案** (wechat)
   - 200-250字
   - 基于使用价值和用户群体，采用公众号的专业风格
   - 正式严谨，突出技术深度
   - 分析项目的技术价值和商业价值
   - 适合分享给团队或技术社区
   - 强调对创业项目或技术团队的实际帮助

## 返回格式

```json
{
  "oneLiner": "项目核心价值的一句话概括",
  "value": "深度分析的使用价值，包含适用领域和场景",
  "audience": "精准的用户群体定位，强调创业者和开发者类型",
  "tags": "标签1,标签2,标签3",
  "xiaohongshu": "小红书风格的推广文案",
  "wechat": "公众号风格的推广文案"
}
```

请务必返回有效的 JSON 格式。"#;

/// Build the user prompt for one repository.
///
/// At most `readme_chars` characters of the README are included.
pub fn build_prompt(record: &EnrichedRecord, readme_chars: usize) -> String {
    let c = &record.candidate;
    let readme_section = if record.has_readme {
        format!(
            "\nREADME 内容摘要：\n{}\n",
            truncate_chars(&record.readme, readme_chars)
        )
    } else {
        String::new()
    };

    format!(
        "你是一位资深的技术产品分析师和营销专家。请深度分析以下 GitHub 开源项目，生成专业的营销内容。\n\n\
         ## 项目基本信息\n\
         - 仓库名称：{}\n\
         - 简短描述：{}\n\
         - 编程语言：{}\n\
         - Stars 数：{}\n\
         - Forks 数：{}\n\
         {}\n\n\
         {}",
        c.name, c.description, c.language, c.stars, c.forks, readme_section, ANALYSIS_INSTRUCTIONS,
    )
}

/// The embedded JSON object in a model reply, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_SPAN.find(text).map(|m| m.as_str())
}

/// Parse a model reply into marketing fields.
///
/// Returns `None` when the reply has no parseable JSON object. Keys that are
/// missing or not text come back as empty strings.
pub fn parse_reply(text: &str) -> Option<MarketingContent> {
    let span = extract_json_object(text)?;
    let value: Value = serde_json::from_str(span).ok()?;
    let object = value.as_object()?;

    let text_field = |key: &str| match object.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    let tags = match object.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        _ => text_field("tags"),
    };

    Some(MarketingContent {
        one_liner: text_field("oneLiner"),
        value: text_field("value"),
        audience: text_field("audience"),
        tags,
        xiaohongshu: text_field("xiaohongshu"),
        wechat: text_field("wechat"),
    })
}

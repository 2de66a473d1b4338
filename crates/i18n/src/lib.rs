use std::collections::BTreeMap;

use core_types::UiLanguage;

#[derive(Debug, Clone)]
pub struct I18n {
    lang: UiLanguage,
    zh_cn: BTreeMap<&'static str, &'static str>,
    en_us: BTreeMap<&'static str, &'static str>,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(UiLanguage::ZhCn)
    }
}

impl I18n {
    pub fn new(lang: UiLanguage) -> Self {
        Self {
            lang,
            zh_cn: zh_cn_map(),
            en_us: en_us_map(),
        }
    }

    pub fn set_language(&mut self, lang: UiLanguage) {
        self.lang = lang;
    }

    pub fn language(&self) -> UiLanguage {
        self.lang
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        match self.lang {
            UiLanguage::ZhCn => self
                .zh_cn
                .get(key)
                .copied()
                .or_else(|| self.en_us.get(key).copied())
                .unwrap_or(key),
            UiLanguage::EnUs => self
                .en_us
                .get(key)
                .copied()
                .or_else(|| self.zh_cn.get(key).copied())
                .unwrap_or(key),
        }
    }

    /// Translates `key` and fills `{name}` placeholders.
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.t(key).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

fn zh_cn_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "抗衰老专家咨询"),
        ("chat.welcome", "您好！我是抗衰老领域专家，请输入您的健康问题。"),
        ("chat.placeholder", "请输入您的健康问题... 例如：NMN 如何补充？"),
        ("chat.pending", "思考中..."),
        ("chat.default_image_prompt", "描述这张图片"),
        ("chat.error_reply", "抱歉，处理您的消息时出错了：{detail}"),
        ("chat.image_attached", "已添加图片：{name}"),
        ("chat.count_failed", "加载知识库统计失败"),
        ("chat.busy", "上一条消息仍在处理中"),
        ("chat.role.user", "你"),
        ("chat.role.assistant", "专家"),
        ("chat.confidence", "置信度：{level}"),
        ("chat.sources", "参考来源：{sources}"),
        ("chat.image_removed", "已移除图片"),
        (
            "chat.repl_help",
            "输入问题后回车发送。/image <路径> 添加图片，/drop-image 移除图片，/count 查看知识库条数，/quit 退出",
        ),
        ("confidence.high", "高"),
        ("confidence.medium", "中"),
        ("confidence.low", "低"),
        ("knowledge.count_label", "知识库: {count} 条"),
        ("knowledge.list_failed", "加载知识列表失败，请稍后重试"),
        ("knowledge.count_failed", "加载知识库统计失败"),
        ("knowledge.detail_failed", "加载详情失败，请稍后重试"),
        ("knowledge.edit_load_failed", "加载知识详情失败，请稍后重试"),
        ("knowledge.content_required", "请输入知识内容"),
        ("knowledge.category_required", "请输入知识分类"),
        ("knowledge.add_success", "知识添加成功！"),
        ("knowledge.add_failed", "添加失败: {detail}"),
        ("knowledge.batch_empty", "没有可添加的知识条目"),
        ("knowledge.batch_success", "成功添加 {count} 条知识！"),
        ("knowledge.update_success", "知识更新成功！"),
        ("knowledge.update_failed", "更新失败: {detail}"),
        ("knowledge.delete_confirm", "确定要删除这条知识吗？删除后无法恢复。"),
        ("knowledge.delete_success", "知识删除成功！"),
        ("knowledge.delete_failed", "删除失败，请稍后重试"),
        ("knowledge.search_failed", "检索失败: {detail}"),
        ("knowledge.empty", "知识库暂无内容"),
        ("knowledge.delete_cancelled", "已取消删除"),
        ("import.unsupported_format", "不支持的文件格式。支持格式：{formats}"),
        ("import.too_large", "文件大小不能超过 10MB"),
        ("import.success", "成功导入 {count} 条知识！"),
        ("import.partial_failed", "有 {count} 条导入失败，请查看详情"),
        ("import.none_imported", "导入失败，没有成功导入任何知识"),
        ("import.failed", "导入失败: {detail}"),
        ("import.row_error", "第 {row} 行：{error}"),
        ("import.summary", "导入完成：成功 {success} 条，失败 {failed} 条，共 {total} 条"),
        ("health.ok", "服务正常"),
        ("health.failed", "服务不可用: {detail}"),
    ])
}

fn en_us_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "Anti-aging Expert Consultation"),
        (
            "chat.welcome",
            "Hello! I am an anti-aging specialist. Ask me a health question.",
        ),
        (
            "chat.placeholder",
            "Type your health question... e.g. How should I take NMN?",
        ),
        ("chat.pending", "Thinking..."),
        ("chat.default_image_prompt", "Describe this image"),
        (
            "chat.error_reply",
            "Sorry, something went wrong while handling your message: {detail}",
        ),
        ("chat.image_attached", "Image attached: {name}"),
        ("chat.count_failed", "Failed to load knowledge base statistics"),
        ("chat.busy", "The previous message is still being processed"),
        ("chat.role.user", "You"),
        ("chat.role.assistant", "Expert"),
        ("chat.confidence", "Confidence: {level}"),
        ("chat.sources", "Sources: {sources}"),
        ("chat.image_removed", "Image removed"),
        (
            "chat.repl_help",
            "Type a question and press Enter. /image <path> attaches an image, /drop-image removes it, /count shows the knowledge base size, /quit exits",
        ),
        ("confidence.high", "High"),
        ("confidence.medium", "Medium"),
        ("confidence.low", "Low"),
        ("knowledge.count_label", "Knowledge base: {count} entries"),
        (
            "knowledge.list_failed",
            "Failed to load the knowledge list, please try again later",
        ),
        ("knowledge.count_failed", "Failed to load knowledge base statistics"),
        (
            "knowledge.detail_failed",
            "Failed to load details, please try again later",
        ),
        (
            "knowledge.edit_load_failed",
            "Failed to load the entry for editing, please try again later",
        ),
        ("knowledge.content_required", "Please enter the knowledge content"),
        ("knowledge.category_required", "Please enter the knowledge category"),
        ("knowledge.add_success", "Knowledge added!"),
        ("knowledge.add_failed", "Add failed: {detail}"),
        ("knowledge.batch_empty", "No knowledge entries to add"),
        ("knowledge.batch_success", "Added {count} knowledge entries!"),
        ("knowledge.update_success", "Knowledge updated!"),
        ("knowledge.update_failed", "Update failed: {detail}"),
        (
            "knowledge.delete_confirm",
            "Delete this knowledge entry? This cannot be undone.",
        ),
        ("knowledge.delete_success", "Knowledge deleted!"),
        ("knowledge.delete_failed", "Delete failed, please try again later"),
        ("knowledge.search_failed", "Search failed: {detail}"),
        ("knowledge.empty", "The knowledge base is empty"),
        ("knowledge.delete_cancelled", "Delete cancelled"),
        (
            "import.unsupported_format",
            "Unsupported file format. Supported formats: {formats}",
        ),
        ("import.too_large", "File size must not exceed 10MB"),
        ("import.success", "Imported {count} knowledge entries!"),
        (
            "import.partial_failed",
            "{count} entries failed to import, see details",
        ),
        (
            "import.none_imported",
            "Import failed, no knowledge entries were imported",
        ),
        ("import.failed", "Import failed: {detail}"),
        ("import.row_error", "Row {row}: {error}"),
        (
            "import.summary",
            "Import finished: {success} succeeded, {failed} failed, {total} total",
        ),
        ("health.ok", "Service healthy"),
        ("health.failed", "Service unavailable: {detail}"),
    ])
}

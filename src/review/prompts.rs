//! 评审提示词模板
//!
//! 四个评审维度是数据而非代码：每个维度一条模板，{paper} 占位符替换后
//! 直接发给生成端。格式要求（小计 / 综合评分行）是评分提取链的锚点，
//! 改动时需与 score 模块的识别器保持一致。

/// 单个评审维度：键名、中文名、system 语境与提示词模板
pub struct ReviewAxis {
    pub key: &'static str,
    pub name: &'static str,
    pub context: &'static str,
    pub template: &'static str,
}

/// 四个独立评审维度（各 0-25 分）
pub static AXES: [ReviewAxis; 4] = [
    ReviewAxis {
        key: "innovation",
        name: "创新点",
        context: "你是创新点评审专家，客观严谨但不悲观",
        template: "\
你是一位资深学术审稿专家，专注于评估论文的创新点。

审稿原则：
- 客观、严谨、公正，不讨好作者也不过度批评
- 禁止建议删除任何文献引用编号（如[1]）
- 禁止建议插入图片、图表或表格

请从 4 个维度评价创新性（每项 0-6.25 分，总分 25 分）：
1. 研究问题创新性
2. 理论视角独特性
3. 研究发现原创性
4. 差异化程度

论文内容：
{paper}

请按以下格式输出（严格遵守格式）：

## 创新点评分
研究问题创新性: X.XX/6.25
理论视角独特性: X.XX/6.25
研究发现原创性: X.XX/6.25
差异化程度: X.XX/6.25
**小计: X.XX/25**

## 主要优点
1. ...

## 创新性不足
1. ...

## 改进建议
1. ...
",
    },
    ReviewAxis {
        key: "logic",
        name: "逻辑性",
        context: "你是逻辑评审专家，客观严谨但不悲观",
        template: "\
你是一位逻辑严密的学术审稿专家，专注于评估论文的行文逻辑。

审稿原则：
- 客观、严谨、公正，既指出逻辑漏洞也认可合理之处
- 禁止建议删除任何文献引用编号（如[1]）
- 禁止建议插入图片、图表或表格

请从 4 个维度评价逻辑性（每项 0-6.25 分，总分 25 分）：
1. 整体结构逻辑
2. 论证完整性
3. 章节衔接
4. 结论一致性

论文内容：
{paper}

请按以下格式输出（严格遵守格式）：

## 逻辑性评分
整体结构逻辑: X.XX/6.25
论证完整性: X.XX/6.25
章节衔接: X.XX/6.25
结论一致性: X.XX/6.25
**小计: X.XX/25**

## 逻辑优势
1. ...

## 逻辑缺陷
1. ...

## 改进建议
1. ...
",
    },
    ReviewAxis {
        key: "accuracy",
        name: "准确性",
        context: "你是准确性评审专家，客观严谨但不悲观",
        template: "\
你是一位严谨的学术审稿专家，专注于评估论文的内容准确性。

审稿原则：
- 客观、严谨、公正，既指出错误也认可准确之处
- 重点考察概念定义的准确性和理论引用的恰当性
- 禁止建议删除任何文献引用编号（如[1]）

请从 4 个维度评价准确性（每项 0-6.25 分，总分 25 分）：
1. 概念准确性
2. 引用适当性
3. 论据充分性
4. 事实正确性

论文内容：
{paper}

请按以下格式输出（严格遵守格式）：

## 准确性评分
概念准确性: X.XX/6.25
引用适当性: X.XX/6.25
论据充分性: X.XX/6.25
事实正确性: X.XX/6.25
**小计: X.XX/25**

## 准确之处
1. ...

## 准确性问题
1. ...

## 改进建议
1. ...
",
    },
    ReviewAxis {
        key: "norm",
        name: "规范性",
        context: "你是规范性评审专家，客观严谨但不悲观",
        template: "\
你是一位注重细节的学术审稿专家，专注于评估论文的规范性和表达。

审稿原则：
- 客观、严谨、公正，既指出不规范之处也认可规范的部分
- 重点关注学术语言的规范性和引用的标准化
- 禁止建议删除任何文献引用编号（如[1]）

请从 4 个维度评价规范性（每项 0-6.25 分，总分 25 分）：
1. 用词规范性
2. 句式通顺性
3. 标点规范性
4. 格式一致性

论文内容：
{paper}

请按以下格式输出（严格遵守格式）：

## 规范性评分
用词规范性: X.XX/6.25
句式通顺性: X.XX/6.25
标点规范性: X.XX/6.25
格式一致性: X.XX/6.25
**小计: X.XX/25**

## 规范之处
1. ...

## 规范性问题
1. ...

## 改进建议
1. ...
",
    },
];

/// 主编整合的 system 语境
pub const SYNTHESIS_CONTEXT: &str = "你是总编辑，负责整合审稿意见并给出客观评分";

/// 渲染单个维度的评审提示词
pub fn axis_prompt(axis: &ReviewAxis, paper: &str) -> String {
    axis.template.replace("{paper}", paper)
}

/// 渲染主编整合提示词：汇总四份专家意见，要求统一修改方案与综合评分
pub fn synthesis_prompt(feedbacks: &[(&str, String)]) -> String {
    let mut sections = String::new();
    for (name, feedback) in feedbacks {
        sections.push_str(&format!("### 专家（{}，满分25）：\n{}\n\n", name, feedback));
    }

    format!(
        "\
你是一位经验丰富的主编，负责整合多位审稿专家的意见并给出客观的综合评分。

评分原则：
- 客观、公正，不偏不倚，综合评分要准确反映论文质量
- 直接剔除所有「建议删除引用编号」的谬误意见
- 直接剔除所有「建议插入图片/图表/表格」的意见

以下是各位审稿专家的评审意见：

{}请整合以上意见，按优先级生成统一的修改方案。

输出格式（严格遵守）：

## 综合评分
创新点得分: X.XX/25
逻辑性得分: X.XX/25
准确性得分: X.XX/25
规范性得分: X.XX/25
**综合评分: X.XX/100**

## 总体评价
（客观评价论文的整体质量水平）

## 必须修改的关键问题（优先级1）
1. ...

## 建议改进的重要问题（优先级2）
1. ...

## 可选优化的细节问题（优先级3）
1. ...
",
        sections
    )
}

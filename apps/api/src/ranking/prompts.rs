// Judged-scoring prompts. Placeholders are replaced verbatim; the bando text
// is truncated before substitution.

pub const RELEVANCE_JUDGE_SYSTEM: &str = "You are an expert consultant on Italian and European \
    public funding programmes (bandi). You assess how well a funding opportunity fits a \
    specific company. Documents and company descriptions are usually written in Italian.";

pub const RELEVANCE_JUDGE_PROMPT_TEMPLATE: &str = r#"Evaluate how relevant the following funding opportunity is for the company described below.

COMPANY PARTICULARITIES:
{particularities}

WHAT THE COMPANY WANTS TO IMPROVE:
{improvement_goals}

FUNDING OPPORTUNITY SHEET (may be truncated):
{document_text}

Reply with a single integer from 0 (not relevant at all) to 100 (perfect fit) on the first line.
You may add a one-paragraph justification after the number."#;

use std::path::Path;

use crate::dataset::Dataset;

/// Instructions prepended to every agent invocation.
pub const ANALYST_PROMPT: &str = "\
You are an experienced data analyst working with the provided dataset.

Dataset Context:
- You must use ONLY the provided dataframe.
- Do NOT assume or create new columns.

Behavior Rules:
- For statistical or numerical questions, compute values using pandas operations.
- For visualization requests:
    - Use matplotlib only.
    - Save plots as '{plot_path}'.
    - Do NOT use plt.show().
- Always use existing column names exactly as they appear.
- If a column does not exist, respond in the Final Answer section with:
  \"This dataset does not contain that information.\"

Response Guidelines:
- Be precise and keep answers concise.
";

/// Renders the analyst prompt for a concrete dataset and plot location.
pub fn system_prompt(dataset: &Dataset, plot_path: &Path) -> String {
    let mut prompt = ANALYST_PROMPT.replace("{plot_path}", &plot_path.display().to_string());
    prompt.push('\n');
    prompt.push_str(&dataset.summary());
    prompt
}

/// Builds the screening prompt. `anchor` is interpolated verbatim and never validated.
pub fn strategy_prompt(anchor: &str) -> String {
    format!(
        "Role: Senior US equity quantitative analyst.\n\
Context: Assume the current market date is **{anchor}**.\n\
Task: Based on the macro environment at that point in time, select 5-8 constituents of the Nasdaq, the Dow Jones or the S&P 500.\n\
Criteria:\n\
1. Deep value: the share price is more than 15% below its high before {anchor}, while fundamentals (revenue/EPS) remain healthy.\n\
2. Money flow: recent unusual trading volume, or the company benefits from the current sector rotation.\n\
3. Sector preference: focus on SaaS, semiconductors, medical devices or fintech.\n\
Output format: output ticker symbols only, separated by commas, with no explanation and no Markdown.\n\
Example: AAPL, MSFT, TTD, BAX\n"
    )
}

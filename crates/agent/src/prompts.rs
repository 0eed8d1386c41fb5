//! Prompt templates for the ReAct agent.
//!
//! Placeholders: `{query}`, `{summaries}` (retrieved text), `{prompt}` (the
//! agent's system prompt) and `{observations}`.

pub const PLANNING_TEMPLATE: &str = "\
You are planning how to answer a user question.

Instructions from the assistant's configuration:
{prompt}

Retrieved context:
{summaries}

Observations so far:
{observations}

Question: {query}

Write a short, numbered plan of the next steps needed to answer the question. \
Name the tools you would use and what you expect to learn from them. \
Do not answer the question yet.";

pub const EXECUTION_INSTRUCTIONS: &str = "\
Follow this plan:
{plan}

Observations so far:
{observations}

Carry out the next steps of the plan using the available tools. \
If the observations already contain enough information to answer the question, \
respond with exactly SATISFIED.";

pub const FINAL_TEMPLATE: &str = "\
Using the observations below, write the final answer to the question.

Question: {query}

Observations:
{observations}

Answer directly and cite what you found. Do not mention the planning process.";

/// Literal the model emits once it has gathered enough information.
pub const SATISFIED_MARKER: &str = "SATISFIED";

/// Substitute `{name}` placeholders in one left-to-right pass. Inserted text
/// is never scanned again.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values.iter().find_map(|(name, value)| {
            let after = tail.strip_prefix(name)?.strip_prefix('}')?;
            Some((*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn planning_prompt(query: &str, summaries: &str, prompt: &str, observations: &str) -> String {
    fill(
        PLANNING_TEMPLATE,
        &[
            ("prompt", prompt),
            ("summaries", summaries),
            ("observations", observations),
            ("query", query),
        ],
    )
}

/// System prompt for the act phase: the agent's own prompt plus the plan.
pub fn execution_prompt(system_prompt: &str, plan: &str, observations: &str) -> String {
    let instructions = fill(
        EXECUTION_INSTRUCTIONS,
        &[("plan", plan), ("observations", observations)],
    );
    format!("{system_prompt}\n\n{instructions}")
}

pub fn final_prompt(query: &str, observations: &str) -> String {
    fill(FINAL_TEMPLATE, &[("observations", observations), ("query", query)])
}

//! Prompt for the LLM fallback classifier.

/// Answer the model is told to give when it cannot classify a label.
pub const UNKNOWN_ANSWER: &str = "unknown";

/// Render the normalization prompt for one cleaned label.
pub fn render_normalize_prompt(name: &str, context_terms: &[&str]) -> String {
    let terms_list = context_terms.join(", ");

    format!(
        r#"You are a food ingredient normalizer. Given an item name scanned from a supermarket receipt, map it to its generic ingredient name.

Scanned item: "{name}"

Known ingredient names: {terms_list}

Reply with ONLY the generic ingredient name, one or two words, preferably one of the known names. If you cannot tell what the item is, reply "{unknown}".

Examples:
- "Bio EHL Champignon" -> mushroom
- "Salchichas Oscar Mayer" -> sausage
- "Tomate Cherry 500g" -> tomato

Ingredient:"#,
        name = name,
        terms_list = terms_list,
        unknown = UNKNOWN_ANSWER,
    )
}

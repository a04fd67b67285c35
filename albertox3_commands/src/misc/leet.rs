use crate::utils::UserError;
use crate::{Context, Error, Scale};

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "misc",
        name: "leet",
        commands: || vec![leet()],
        subscribe: None,
    }
}

/// Converts a text into leetspeak.
#[must_use]
pub fn to_leet(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_ascii_lowercase() {
            'o' => '0',
            'i' | 'l' => '1',
            'z' => '2',
            'e' => '3',
            'a' => '4',
            's' => '5',
            't' => '7',
            'b' => '8',
            'g' => '9',
            _ => c,
        })
        .collect()
}

/// Converts a text into leetspeak.
#[poise::command(prefix_command, category = "Misc")]
pub async fn leet(ctx: Context<'_>, #[rest] text: Option<String>) -> Result<(), Error> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        let message = crate::utils::translator(ctx, "leet").text("empty")?;
        return Err(UserError::Assertion(message).into());
    };

    ctx.say(to_leet(&text)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_case_insensitive() {
        assert_eq!(to_leet("Leet Speak"), "1337 5p34k");
        assert_eq!(to_leet("OBLIGATORISCH"), "08119470R15CH");
        assert_eq!(to_leet("xyz 123!"), "xy2 123!");
    }
}

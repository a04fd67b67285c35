use serenity::all::UserId;
use sqlx::PgConnection;

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct YesNoQuestion {
    pub id: i32,
    pub group: String,
    pub creator: i64,
    pub question: String,
    pub is_true: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct QuadQuestion {
    pub id: i32,
    pub group: String,
    pub creator: i64,
    pub question: String,
    pub correct: String,
    pub false1: String,
    pub false2: String,
    pub false3: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Question {
    YesNo(YesNoQuestion),
    Quad(QuadQuestion),
}

impl Question {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Question::YesNo(q) => &q.question,
            Question::Quad(q) => &q.question,
        }
    }

    /// Possible answers in a fixed order, the correct one is at the returned index.
    #[must_use]
    pub fn answers(&self, yes: &str, no: &str) -> (Vec<String>, usize) {
        match self {
            Question::YesNo(q) => (vec![yes.to_owned(), no.to_owned()], usize::from(!q.is_true)),
            Question::Quad(q) => (
                vec![
                    q.correct.clone(),
                    q.false1.clone(),
                    q.false2.clone(),
                    q.false3.clone(),
                ],
                0,
            ),
        }
    }
}

/// Every question of a group, yes/no questions first.
pub async fn get_group(conn: &mut PgConnection, group: &str) -> Result<Vec<Question>, sqlx::Error> {
    let yesno: Vec<YesNoQuestion> = sqlx::query_as(
        r#"SELECT id, "group", creator, question, is_true FROM quiz_yesno WHERE "group" = $1 ORDER BY id"#,
    )
    .bind(group)
    .fetch_all(&mut *conn)
    .await?;

    let quad: Vec<QuadQuestion> = sqlx::query_as(
        r#"SELECT id, "group", creator, question, correct, false1, false2, false3 FROM quiz_quad
           WHERE "group" = $1 ORDER BY id"#,
    )
    .bind(group)
    .fetch_all(conn)
    .await?;

    Ok(yesno
        .into_iter()
        .map(Question::YesNo)
        .chain(quad.into_iter().map(Question::Quad))
        .collect())
}

/// Every group together with its amount of questions.
pub async fn groups(conn: &mut PgConnection) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT "group", COUNT(*) FROM (
               SELECT "group" FROM quiz_yesno UNION ALL SELECT "group" FROM quiz_quad
           ) AS questions GROUP BY "group" ORDER BY "group""#,
    )
    .fetch_all(conn)
    .await
}

pub async fn add_yesno(
    conn: &mut PgConnection,
    group: &str,
    creator: UserId,
    question: &str,
    is_true: bool,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r#"INSERT INTO quiz_yesno ("group", creator, question, is_true) VALUES ($1, $2, $3, $4) RETURNING id"#,
    )
    .bind(group)
    .bind(creator.get() as i64)
    .bind(question)
    .bind(is_true)
    .fetch_one(conn)
    .await
}

pub async fn add_quad(
    conn: &mut PgConnection,
    group: &str,
    creator: UserId,
    question: &str,
    correct: &str,
    wrong: [&str; 3],
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r#"INSERT INTO quiz_quad ("group", creator, question, correct, false1, false2, false3)
           VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"#,
    )
    .bind(group)
    .bind(creator.get() as i64)
    .bind(question)
    .bind(correct)
    .bind(wrong[0])
    .bind(wrong[1])
    .bind(wrong[2])
    .fetch_one(conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_order() {
        let yesno = Question::YesNo(YesNoQuestion {
            id: 1,
            group: "rust".into(),
            creator: 1,
            question: "Is Rust memory safe?".into(),
            is_true: true,
        });
        assert_eq!(yesno.answers("Yes", "No"), (vec!["Yes".into(), "No".into()], 0));

        let quad = Question::Quad(QuadQuestion {
            id: 2,
            group: "rust".into(),
            creator: 1,
            question: "Which keyword declares a trait?".into(),
            correct: "trait".into(),
            false1: "class".into(),
            false2: "interface".into(),
            false3: "impl".into(),
        });
        let (answers, correct) = quad.answers("Yes", "No");
        assert_eq!(answers.len(), 4);
        assert_eq!(answers[correct], "trait");
        assert_eq!(quad.text(), "Which keyword declares a trait?");
    }
}

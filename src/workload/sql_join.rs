//! Joins users with the questions they asked.
//!
//! ```sql
//! SELECT Users.Id, Users.DisplayName, Users.Reputation,
//!        Posts.Title, Posts.AnswerCount, Posts.CommentCount
//! FROM Users JOIN Posts ON Users.Id = Posts.OwnerUserId
//! WHERE Posts.PostTypeId = 1 AND Users.Reputation >= 500
//! ```
//!
//! The job reads two CSV tables: the users table first, the posts table
//! second. Both are keyed by user id; the reducer for an id pairs the user
//! with each of their questions.

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;

use crate::format::{Format, Record};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::workload::columns::Columns;
use crate::{Job, Value};

pub const FORMAT: Format = Format::CsvSkipFirstLine;

const USERS: usize = 0;
const POSTS: usize = 1;
const QUESTION: &str = "1";

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// Lowest reputation of the users to report
    #[clap(long, default_value_t = 500)]
    min_reputation: i64,
}

/// A row of either table, reduced to the columns the join reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Joined {
    User {
        name: String,
        reputation: i64,
    },
    Question {
        title: String,
        answers: String,
        comments: String,
    },
}

pub struct Join {
    users: Columns,
    posts: Columns,
    min_reputation: i64,
}

impl Join {
    pub fn new(users: Columns, posts: Columns, min_reputation: i64) -> Self {
        Self {
            users,
            posts,
            min_reputation,
        }
    }

    pub fn map(&self, record: Record, cx: &mut MapContext<String, Joined, Value>) -> Result<()> {
        let (source, fields) = match record {
            Record::Row { source, fields } => (source, fields),
            other => bail!("join reads CSV rows, got {other:?}"),
        };

        match source {
            USERS => {
                let id = self.users.get(&fields, "Id")?;
                if id.is_empty() {
                    return Ok(());
                }
                let reputation = self.users.get(&fields, "Reputation")?;
                let user = Joined::User {
                    name: self.users.get(&fields, "DisplayName")?.to_string(),
                    reputation: reputation
                        .trim()
                        .parse()
                        .with_context(|| format!("bad reputation `{reputation}` for user {id}"))?,
                };
                cx.emit_intermediate(id.to_string(), user);
            }
            POSTS => {
                if self.posts.get(&fields, "PostTypeId")? != QUESTION {
                    return Ok(());
                }
                let owner = self.posts.get(&fields, "OwnerUserId")?;
                if owner.is_empty() {
                    return Ok(());
                }
                let question = Joined::Question {
                    title: self.posts.get(&fields, "Title")?.to_string(),
                    answers: self.posts.get(&fields, "AnswerCount")?.to_string(),
                    comments: self.posts.get(&fields, "CommentCount")?.to_string(),
                };
                cx.emit_intermediate(owner.to_string(), question);
            }
            other => bail!("join reads two tables, got a row from input {other}"),
        }
        Ok(())
    }

    pub fn reduce(&self, id: &str, rows: Vec<Joined>, cx: &mut ReduceContext<Value>) -> Result<()> {
        let mut user = None;
        let mut questions = Vec::new();
        for row in rows {
            match row {
                Joined::User { name, reputation } => user = Some((name, reputation)),
                question => questions.push(question),
            }
        }

        let Some((name, reputation)) = user else {
            return Ok(());
        };
        if reputation < self.min_reputation {
            return Ok(());
        }
        for question in questions {
            if let Joined::Question {
                title,
                answers,
                comments,
            } = question
            {
                cx.emit(Value::tuple([
                    Value::from(id),
                    Value::from(name.as_str()),
                    Value::Int(reputation),
                    Value::from(title),
                    Value::from(answers),
                    Value::from(comments),
                ]));
            }
        }
        Ok(())
    }
}

pub fn run(job: &Job) -> Result<Vec<Value>> {
    ensure!(
        job.inputs.len() == 2,
        "sql-join reads exactly two inputs, the users table then the posts table, got {}",
        job.inputs.len()
    );
    let args: Args = job.parse_args()?;
    let join = Join::new(
        Columns::read(&job.inputs[USERS])?,
        Columns::read(&job.inputs[POSTS])?,
        args.min_reputation,
    );

    Ok(engine::run(
        job.mode,
        job.inputs.clone(),
        FORMAT,
        |record, cx| join.map(record, cx),
        |id, rows, cx| join.reduce(id, rows, cx),
    )?)
}

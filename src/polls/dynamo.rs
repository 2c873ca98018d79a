//! DynamoDB-backed [`PollStore`].
//!
//! Each poll is one item keyed by `id` (string hash key). Attribute names
//! match the JSON field names of [`Poll`]. Options and votes are stored as
//! lists of maps.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ReturnValue, ReturnValuesOnConditionCheckFailure, ScalarAttributeType,
};
use tracing::{debug, info, warn};
use voting_common::{Poll, PollOption, Vote};

use super::store::{PollStore, sort_polls};
use crate::errors::PollError;

type Item = HashMap<String, AttributeValue>;

const KEY: &str = "id";

const APPEND_VOTE_UPDATE: &str =
    "SET votes = list_append(if_not_exists(votes, :empty), :vote), updatedAt = :updatedAt";

/// The poll must exist and its stored `updatedAt` must not be later than the
/// new stamp.
const APPEND_VOTE_CONDITION: &str =
    "attribute_exists(id) AND (attribute_not_exists(updatedAt) OR updatedAt <= :updatedAt)";

pub struct DynamoPollStore {
    client: Client,
    table: String,
}

impl DynamoPollStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Build a client from the SDK's default provider chain, optionally
    /// pinning the region and endpoint (e.g. DynamoDB Local).
    pub async fn connect(
        table: impl Into<String>,
        region: Option<String>,
        endpoint_url: Option<String>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint_url) = endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the poll table if it does not exist yet.
    ///
    /// Fails with [`PollError::Conflict`] when the table is already present.
    pub async fn ensure_table(&self) -> Result<(), PollError> {
        match self.client.describe_table().table_name(&self.table).send().await {
            Ok(_) => {
                warn!(table = %self.table, "table already exists");
                return Err(PollError::Conflict {
                    id: self.table.clone(),
                });
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if !service_err.is_resource_not_found_exception() {
                    return Err(sdk_failure("describe table", service_err));
                }
            }
        }

        info!(table = %self.table, "table does not exist, creating");
        let key_schema = KeySchemaElement::builder()
            .attribute_name(KEY)
            .key_type(KeyType::Hash)
            .build()
            .map_err(PollError::persistence)?;
        let key_definition = AttributeDefinition::builder()
            .attribute_name(KEY)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(PollError::persistence)?;
        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(1)
            .write_capacity_units(1)
            .build()
            .map_err(PollError::persistence)?;

        self.client
            .create_table()
            .table_name(&self.table)
            .key_schema(key_schema)
            .attribute_definitions(key_definition)
            .provisioned_throughput(throughput)
            .send()
            .await
            .map_err(|err| sdk_failure("create table", err.into_service_error()))?;

        info!(table = %self.table, "table created");
        Ok(())
    }
}

#[async_trait]
impl PollStore for DynamoPollStore {
    async fn scan(&self) -> Result<Vec<Poll>, PollError> {
        let mut polls = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|err| sdk_failure("scan", err.into_service_error()))?;

            for item in output.items() {
                polls.push(poll_from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        debug!(table = %self.table, count = polls.len(), "scanned polls");
        sort_polls(&mut polls);
        Ok(polls)
    }

    async fn get(&self, poll_id: &str) -> Result<Option<Poll>, PollError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY, AttributeValue::S(poll_id.to_string()))
            .send()
            .await
            .map_err(|err| sdk_failure("get item", err.into_service_error()))?;

        output.item().map(poll_from_item).transpose()
    }

    async fn put_if_absent(&self, poll: &Poll) -> Result<(), PollError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(poll_to_item(poll)))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    Err(PollError::Conflict {
                        id: poll.id.clone(),
                    })
                } else {
                    Err(sdk_failure("put item", service_err))
                }
            }
        }
    }

    async fn append_vote(
        &self,
        poll_id: &str,
        vote: &Vote,
        updated_at: &str,
    ) -> Result<Vec<Vote>, PollError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key(KEY, AttributeValue::S(poll_id.to_string()))
            .update_expression(APPEND_VOTE_UPDATE)
            .condition_expression(APPEND_VOTE_CONDITION)
            .expression_attribute_values(":empty", AttributeValue::L(Vec::new()))
            .expression_attribute_values(":vote", AttributeValue::L(vec![vote_to_attr(vote)]))
            .expression_attribute_values(":updatedAt", AttributeValue::S(updated_at.to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                return Err(match err.into_service_error() {
                    UpdateItemError::ConditionalCheckFailedException(failed) => {
                        append_rejected(poll_id, failed.item())
                    }
                    other => sdk_failure("update item", other),
                });
            }
        };

        let attributes = output
            .attributes()
            .ok_or_else(|| PollError::persistence(anyhow!("update returned no attributes")))?;
        votes_from_attr(attributes.get("votes"))
    }
}

/// Classify a failed append condition: a missing item means the poll is
/// gone, a present one means a newer `updatedAt` won.
fn append_rejected(poll_id: &str, stored: Option<&Item>) -> PollError {
    match stored {
        Some(item) => {
            debug!(
                poll_id,
                stored_updated_at = ?item.get("updatedAt"),
                "vote stamp is older than stored updatedAt"
            );
            PollError::Conflict {
                id: poll_id.to_string(),
            }
        }
        None => PollError::NotFound {
            id: poll_id.to_string(),
        },
    }
}

fn sdk_failure<E>(operation: &str, err: E) -> PollError
where
    E: std::error::Error + Send + Sync + 'static,
{
    PollError::persistence(anyhow!(
        "DynamoDB {} failed: {}",
        operation,
        DisplayErrorContext(&err)
    ))
}

// ── Item conversion ──────────────────────────────────────────────────

fn malformed(what: &str) -> PollError {
    PollError::persistence(anyhow!("malformed poll item: {}", what))
}

fn string_attr(item: &Item, key: &str) -> Result<String, PollError> {
    match item.get(key) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        Some(_) => Err(malformed(&format!("`{}` is not a string", key))),
        None => Err(malformed(&format!("missing `{}`", key))),
    }
}

fn list_attr<'a>(item: &'a Item, key: &str) -> Result<&'a [AttributeValue], PollError> {
    match item.get(key) {
        Some(AttributeValue::L(values)) => Ok(values),
        Some(_) => Err(malformed(&format!("`{}` is not a list", key))),
        None => Ok(&[]),
    }
}

fn map_entry<'a>(value: &'a AttributeValue, what: &str) -> Result<&'a Item, PollError> {
    match value {
        AttributeValue::M(map) => Ok(map),
        _ => Err(malformed(&format!("{} entry is not a map", what))),
    }
}

pub(crate) fn poll_to_item(poll: &Poll) -> Item {
    let options = poll
        .options
        .iter()
        .map(|option| {
            AttributeValue::M(HashMap::from([
                ("id".to_string(), AttributeValue::S(option.id.clone())),
                ("text".to_string(), AttributeValue::S(option.text.clone())),
            ]))
        })
        .collect();

    HashMap::from([
        (KEY.to_string(), AttributeValue::S(poll.id.clone())),
        ("question".to_string(), AttributeValue::S(poll.question.clone())),
        ("options".to_string(), AttributeValue::L(options)),
        (
            "votes".to_string(),
            AttributeValue::L(poll.votes.iter().map(vote_to_attr).collect()),
        ),
        ("createdBy".to_string(), AttributeValue::S(poll.created_by.clone())),
        ("createdAt".to_string(), AttributeValue::S(poll.created_at.clone())),
        ("updatedAt".to_string(), AttributeValue::S(poll.updated_at.clone())),
    ])
}

pub(crate) fn poll_from_item(item: &Item) -> Result<Poll, PollError> {
    let options = list_attr(item, "options")?
        .iter()
        .map(|value| {
            let map = map_entry(value, "option")?;
            Ok(PollOption::with_id(
                string_attr(map, "id")?,
                string_attr(map, "text")?,
            ))
        })
        .collect::<Result<Vec<_>, PollError>>()?;

    let votes = list_attr(item, "votes")?
        .iter()
        .map(vote_from_attr)
        .collect::<Result<Vec<_>, PollError>>()?;

    Ok(Poll {
        id: string_attr(item, KEY)?,
        question: string_attr(item, "question")?,
        options,
        votes,
        created_by: string_attr(item, "createdBy")?,
        created_at: string_attr(item, "createdAt")?,
        updated_at: string_attr(item, "updatedAt")?,
    })
}

fn vote_to_attr(vote: &Vote) -> AttributeValue {
    let mut map = HashMap::from([
        ("id".to_string(), AttributeValue::S(vote.id.clone())),
        ("option".to_string(), AttributeValue::S(vote.option.clone())),
        ("user".to_string(), AttributeValue::S(vote.user.clone())),
        ("createdAt".to_string(), AttributeValue::S(vote.created_at.clone())),
    ]);
    if let Some(option_id) = &vote.option_id {
        map.insert("optionId".to_string(), AttributeValue::S(option_id.clone()));
    }
    AttributeValue::M(map)
}

fn vote_from_attr(value: &AttributeValue) -> Result<Vote, PollError> {
    let map = map_entry(value, "vote")?;
    let option_id = match map.get("optionId") {
        Some(_) => Some(string_attr(map, "optionId")?),
        None => None,
    };
    Ok(Vote {
        id: string_attr(map, "id")?,
        option_id,
        option: string_attr(map, "option")?,
        user: string_attr(map, "user")?,
        created_at: string_attr(map, "createdAt")?,
    })
}

fn votes_from_attr(value: Option<&AttributeValue>) -> Result<Vec<Vote>, PollError> {
    match value {
        Some(AttributeValue::L(values)) => values.iter().map(vote_from_attr).collect(),
        Some(_) => Err(malformed("`votes` is not a list")),
        None => Ok(Vec::new()),
    }
}

//! The travel planner: a checkpointed three-step graph that searches flights
//! and hotels, pauses for the traveller's choice, then drafts the trip.
//!
//! ```text
//! START -> flightsFinder -> hotelsFinder -> (interrupt) -> tripPlanner -> END
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tripgraph_core::config::RunConfig;
use tripgraph_core::llm::{LanguageModel, LlmRequest};
use tripgraph_core::messaging::AgentMessage;
use tripgraph_core::persistence::Checkpointer;
use tripgraph_core::state::GraphState;
use tripgraph_core::tools::ToolBox;
use tripgraph_runtime::{
    CompileOptions, CompiledGraph, Node, ReactAgent, ReactAgentBuilder, StateGraph, END, START,
};

/// Node that searches flights.
pub const FLIGHTS_FINDER: &str = "flightsFinder";
/// Node that searches hotels.
pub const HOTELS_FINDER: &str = "hotelsFinder";
/// Node that drafts the final plan.
pub const TRIP_PLANNER: &str = "tripPlanner";
/// Origin used for the flight search when none is given.
pub const DEFAULT_ORIGIN: &str = "india mumbai";
/// Destination used when none is given.
pub const DEFAULT_DESTINATION: &str = "Dubai";

/// Trip being planned. Unset fields are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripState {
    /// Where the traveller wants to go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Hotel suggestions written by `hotelsFinder`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_options: Option<String>,
    /// Flight suggestions written by `flightsFinder`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_options: Option<String>,
    /// Hotel the traveller picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_hotel: Option<String>,
    /// Flight the traveller picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_flight: Option<String>,
    /// Plan written by `tripPlanner`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Partial [`TripState`]: every `Some` field replaces the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdate {
    /// New destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// New hotel options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_options: Option<String>,
    /// New flight options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_options: Option<String>,
    /// New hotel selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_hotel: Option<String>,
    /// New flight selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_flight: Option<String>,
    /// New plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl TripUpdate {
    /// Update that only sets the destination; the usual run input.
    pub fn destination(destination: impl Into<String>) -> Self {
        Self {
            destination: Some(destination.into()),
            ..Self::default()
        }
    }

    /// Update recording the traveller's choices.
    pub fn selection(hotel: Option<String>, flight: Option<String>) -> Self {
        Self {
            selected_hotel: hotel,
            selected_flight: flight,
            ..Self::default()
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl GraphState for TripState {
    type Update = TripUpdate;

    fn apply(&mut self, update: TripUpdate) {
        fn merge(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        merge(&mut self.destination, update.destination);
        merge(&mut self.hotel_options, update.hotel_options);
        merge(&mut self.flight_options, update.flight_options);
        merge(&mut self.selected_hotel, update.selected_hotel);
        merge(&mut self.selected_flight, update.selected_flight);
        merge(&mut self.result, update.result);
    }
}

fn or_unset(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("not selected yet")
}

/// Request handed to the flight search agent.
pub fn flights_prompt(origin: &str, state: &TripState) -> String {
    format!(
        "please help find a list of flights for the user based on their choice of destination from {origin}. {}",
        state.destination.as_deref().unwrap_or_default()
    )
}

/// Request handed to the hotel search agent.
pub fn hotels_prompt(state: &TripState) -> String {
    format!(
        "please help find a list of hotels for the user based on their choice of destination. {}",
        state.destination.as_deref().unwrap_or_default()
    )
}

/// Prompt for the final planning call.
pub fn planner_prompt(state: &TripState) -> String {
    format!(
        "given the choice of destination: {}, flight: {}, hotel: {}\nhelp plan a small trip",
        or_unset(&state.destination),
        or_unset(&state.selected_flight),
        or_unset(&state.selected_hotel)
    )
}

async fn last_reply(agent: &ReactAgent, prompt: String) -> anyhow::Result<String> {
    let result = agent.invoke(vec![AgentMessage::user(prompt)], RunConfig::new()).await?;
    result
        .last_message()
        .map(|message| message.text_content())
        .ok_or_else(|| anyhow::anyhow!("agent `{}` returned no messages", agent.name()))
}

struct FlightsFinder {
    agent: ReactAgent,
    origin: String,
}

#[async_trait]
impl Node<TripState> for FlightsFinder {
    async fn run(&self, state: TripState, _config: &RunConfig) -> anyhow::Result<TripUpdate> {
        let options = last_reply(&self.agent, flights_prompt(&self.origin, &state)).await?;
        Ok(TripUpdate {
            flight_options: Some(options),
            ..TripUpdate::default()
        })
    }
}

struct HotelsFinder {
    agent: ReactAgent,
}

#[async_trait]
impl Node<TripState> for HotelsFinder {
    async fn run(&self, state: TripState, _config: &RunConfig) -> anyhow::Result<TripUpdate> {
        let options = last_reply(&self.agent, hotels_prompt(&state)).await?;
        Ok(TripUpdate {
            hotel_options: Some(options),
            ..TripUpdate::default()
        })
    }
}

struct TripPlanner {
    model: Arc<dyn LanguageModel>,
}

#[async_trait]
impl Node<TripState> for TripPlanner {
    async fn run(&self, state: TripState, _config: &RunConfig) -> anyhow::Result<TripUpdate> {
        let request = LlmRequest::new("", vec![AgentMessage::user(planner_prompt(&state))]);
        let response = self.model.generate(request).await?;
        Ok(TripUpdate {
            result: Some(response.message.text_content()),
            ..TripUpdate::default()
        })
    }
}

/// Knobs for [`build_travel_graph`].
#[derive(Clone)]
pub struct TravelOptions {
    /// Flight search origin.
    pub origin: String,
    /// Store for the run's checkpoints; required to pause and resume.
    pub checkpointer: Option<Arc<dyn Checkpointer>>,
    /// Nodes after which the run pauses. Defaults to `hotelsFinder`.
    pub interrupt_after: Vec<String>,
}

impl Default for TravelOptions {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            checkpointer: None,
            interrupt_after: vec![HOTELS_FINDER.to_string()],
        }
    }
}

impl TravelOptions {
    /// Sets the flight search origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets the checkpoint store.
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Replaces the pause points.
    pub fn with_interrupt_after<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.interrupt_after = nodes.into_iter().map(Into::into).collect();
        self
    }
}

fn finder_agent(
    name: &str,
    model: &Arc<dyn LanguageModel>,
    tools: &[ToolBox],
) -> anyhow::Result<ReactAgent> {
    ReactAgentBuilder::new(name)
        .with_model(model.clone())
        .with_tools(tools.iter().cloned())
        .build()
}

/// Compiles the travel planner graph.
pub fn build_travel_graph(
    model: Arc<dyn LanguageModel>,
    tools: Vec<ToolBox>,
    options: TravelOptions,
) -> anyhow::Result<CompiledGraph<TripState>> {
    let flights = FlightsFinder {
        agent: finder_agent(FLIGHTS_FINDER, &model, &tools)?,
        origin: options.origin,
    };
    let hotels = HotelsFinder {
        agent: finder_agent(HOTELS_FINDER, &model, &tools)?,
    };
    let planner = TripPlanner { model };

    let mut compile = CompileOptions::new().with_interrupt_after(options.interrupt_after);
    if let Some(checkpointer) = options.checkpointer {
        compile = compile.with_checkpointer(checkpointer);
    }

    let graph = StateGraph::new("travelPlanner")
        .add_node(FLIGHTS_FINDER, flights)
        .add_node(HOTELS_FINDER, hotels)
        .add_node(TRIP_PLANNER, planner)
        .add_edge(START, FLIGHTS_FINDER)
        .add_edge(FLIGHTS_FINDER, HOTELS_FINDER)
        .add_edge(HOTELS_FINDER, TRIP_PLANNER)
        .add_edge(TRIP_PLANNER, END)
        .compile(compile)?;
    Ok(graph)
}

/// Records the traveller's choices as if `hotelsFinder` had produced them,
/// so resuming the thread runs `tripPlanner` next. Returns the checkpoint id.
///
/// The thread must be paused with `tripPlanner` pending.
pub async fn record_selection(
    graph: &CompiledGraph<TripState>,
    config: &RunConfig,
    hotel: Option<String>,
    flight: Option<String>,
) -> anyhow::Result<String> {
    let update = TripUpdate::selection(hotel, flight);
    anyhow::ensure!(!update.is_empty(), "select a hotel or a flight to continue");

    let thread = config.thread_id.as_deref().unwrap_or_default();
    let snapshot = graph
        .get_state(config)
        .await?
        .ok_or_else(|| anyhow::anyhow!("thread `{thread}` has no saved trip to update"))?;
    anyhow::ensure!(
        snapshot.next.iter().any(|node| node == TRIP_PLANNER),
        "thread `{thread}` is not waiting for a selection (next: {:?})",
        snapshot.next
    );

    Ok(graph
        .update_state(config, update, Some(HOTELS_FINDER))
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trip_state_serializes_camel_case_without_unset_fields() {
        let mut state = TripState::default();
        state.apply(TripUpdate::destination("Dubai"));
        state.apply(TripUpdate {
            flight_options: Some("EK 501".into()),
            ..TripUpdate::default()
        });
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"destination": "Dubai", "flightOptions": "EK 501"})
        );
    }

    #[test]
    fn update_keeps_fields_it_does_not_set() {
        let mut state = TripState {
            destination: Some("Dubai".into()),
            hotel_options: Some("Atlantis".into()),
            ..TripState::default()
        };
        state.apply(TripUpdate::selection(Some("Atlantis".into()), None));
        assert_eq!(state.hotel_options.as_deref(), Some("Atlantis"));
        assert_eq!(state.selected_hotel.as_deref(), Some("Atlantis"));
        assert_eq!(state.destination.as_deref(), Some("Dubai"));
        assert!(TripUpdate::default().is_empty());
    }

    #[test]
    fn prompts_mention_destination_and_choices() {
        let state = TripState {
            destination: Some("Dubai".into()),
            selected_flight: Some("EK 501".into()),
            ..TripState::default()
        };
        assert!(flights_prompt(DEFAULT_ORIGIN, &state)
            .ends_with("from india mumbai. Dubai"));
        assert!(hotels_prompt(&state).ends_with("destination. Dubai"));
        let plan = planner_prompt(&state);
        assert!(plan.contains("destination: Dubai, flight: EK 501, hotel: not selected yet"));
        assert!(plan.ends_with("help plan a small trip"));
    }
}

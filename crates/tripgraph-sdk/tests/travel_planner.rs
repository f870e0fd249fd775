use std::sync::Arc;

use futures::TryStreamExt;
use tripgraph_core::config::RunConfig;
use tripgraph_core::error::GraphError;
use tripgraph_core::interrupt::InterruptKind;
use tripgraph_core::messaging::AgentMessage;
use tripgraph_core::persistence::{CheckpointSource, InMemoryCheckpointer};
use tripgraph_runtime::{ScriptedModel, StreamChunk, StreamMode};
use tripgraph_sdk::travel::{
    build_travel_graph, record_selection, TravelOptions, TripState, TripUpdate, HOTELS_FINDER,
    TRIP_PLANNER,
};

fn scripted() -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel::new([
        AgentMessage::agent("1. Emirates EK 501 BOM-DXB"),
        AgentMessage::agent("1. Atlantis The Palm"),
        AgentMessage::agent("Day 1: arrive on EK 501, check in at Atlantis."),
    ]))
}

#[tokio::test]
async fn pauses_after_hotels_then_plans_with_selection() {
    let model = scripted();
    let saver = Arc::new(InMemoryCheckpointer::new());
    let graph = build_travel_graph(
        model.clone(),
        Vec::new(),
        TravelOptions::default().with_checkpointer(saver.clone()),
    )
    .unwrap();
    let config = RunConfig::for_thread("trip-1");

    let chunks: Vec<StreamChunk<TripState>> = graph
        .stream(
            Some(TripUpdate::destination("Dubai")),
            config.clone(),
            StreamMode::Values,
        )
        .try_collect()
        .await
        .unwrap();

    assert_eq!(chunks.len(), 4);
    let input = chunks[0].values().unwrap();
    assert_eq!(input.destination.as_deref(), Some("Dubai"));
    assert!(input.flight_options.is_none());

    let after_flights = chunks[1].values().unwrap();
    assert_eq!(after_flights.flight_options.as_deref(), Some("1. Emirates EK 501 BOM-DXB"));

    let after_hotels = chunks[2].values().unwrap();
    assert_eq!(after_hotels.hotel_options.as_deref(), Some("1. Atlantis The Palm"));
    assert!(after_hotels.result.is_none());

    let interrupt = chunks[3].interrupt().unwrap();
    assert_eq!(interrupt.kind, InterruptKind::After);
    assert_eq!(interrupt.node, HOTELS_FINDER);
    assert_eq!(interrupt.next, vec![TRIP_PLANNER.to_string()]);

    let flight_request = &model.requests()[0];
    assert!(flight_request.messages[0]
        .text_content()
        .contains("from india mumbai. Dubai"));

    record_selection(
        &graph,
        &config,
        Some("Atlantis The Palm".into()),
        Some("EK 501".into()),
    )
    .await
    .unwrap();
    let pending = graph.get_state(&config).await.unwrap().unwrap();
    assert_eq!(pending.metadata.source, CheckpointSource::Update);
    assert_eq!(pending.next, vec![TRIP_PLANNER.to_string()]);

    let resumed: Vec<StreamChunk<TripState>> = graph
        .stream(None, config.clone(), StreamMode::Values)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(resumed.len(), 1);
    let done = resumed[0].values().unwrap();
    assert_eq!(
        done.result.as_deref(),
        Some("Day 1: arrive on EK 501, check in at Atlantis.")
    );
    assert_eq!(done.selected_hotel.as_deref(), Some("Atlantis The Palm"));

    let plan_prompt = model.requests()[2].messages[0].text_content();
    assert!(plan_prompt.contains("flight: EK 501, hotel: Atlantis The Palm"));

    assert!(graph.get_state(&config).await.unwrap().unwrap().next.is_empty());
    let history = graph.get_state_history(&config, None).await.unwrap();
    assert_eq!(history.len(), 5);
}

#[tokio::test]
async fn runs_straight_through_without_interrupts() {
    let graph = build_travel_graph(
        scripted(),
        Vec::new(),
        TravelOptions::default()
            .with_origin("germany berlin")
            .with_interrupt_after(Vec::<String>::new()),
    )
    .unwrap();

    let state = graph
        .invoke(Some(TripUpdate::destination("Dubai")), RunConfig::new())
        .await
        .unwrap();
    assert!(state.flight_options.is_some());
    assert!(state.hotel_options.is_some());
    assert!(state.result.is_some());
}

#[tokio::test]
async fn resuming_needs_a_checkpointer() {
    let graph = build_travel_graph(scripted(), Vec::new(), TravelOptions::default()).unwrap();
    let err = graph.invoke(None, RunConfig::new()).await.unwrap_err();
    assert!(matches!(err, GraphError::NoCheckpointer));
}

#[tokio::test]
async fn empty_selection_is_rejected() {
    let graph = build_travel_graph(
        scripted(),
        Vec::new(),
        TravelOptions::default().with_checkpointer(Arc::new(InMemoryCheckpointer::new())),
    )
    .unwrap();
    let err = record_selection(&graph, &RunConfig::for_thread("t"), None, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("select a hotel or a flight"));
}

#[tokio::test]
async fn selection_needs_a_paused_thread() {
    let saver = Arc::new(InMemoryCheckpointer::new());
    let graph = build_travel_graph(
        scripted(),
        Vec::new(),
        TravelOptions::default().with_checkpointer(saver.clone()),
    )
    .unwrap();

    let never_run = RunConfig::for_thread("never-run");
    let err = record_selection(&graph, &never_run, Some("Hilton".into()), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no saved trip"));
    assert!(graph.get_state(&never_run).await.unwrap().is_none());
}

#[tokio::test]
async fn selection_after_the_plan_is_rejected() {
    let graph = build_travel_graph(
        scripted(),
        Vec::new(),
        TravelOptions::default()
            .with_checkpointer(Arc::new(InMemoryCheckpointer::new()))
            .with_interrupt_after(Vec::<String>::new()),
    )
    .unwrap();
    let config = RunConfig::for_thread("finished");
    graph
        .invoke(Some(TripUpdate::destination("Dubai")), config.clone())
        .await
        .unwrap();

    let err = record_selection(&graph, &config, None, Some("EK 501".into()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not waiting for a selection"));
}

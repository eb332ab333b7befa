//! Conflation driven by the real background scheduler.

use std::sync::Arc;
use std::time::Duration;

use lattice_grid::layer::register_listener;
use lattice_grid::{
    ConflationConfig, DataLayer, DummyDataProvider, EventConflaterChain, Layer, LayerEvent, LayerId, LayerListener,
    UiQueue, ViewportLayer, VisualChangeEventConflater,
};
use parking_lot::Mutex;

fn fast() -> ConflationConfig {
    ConflationConfig {
        initial_delay_ms: 30,
        refresh_interval_ms: 20,
    }
}

fn recording_chain(queue: &Arc<UiQueue>) -> (Arc<EventConflaterChain>, Arc<Mutex<Vec<Vec<LayerEvent>>>>) {
    let chain = Arc::new(EventConflaterChain::new(queue.clone(), &fast()).unwrap());
    let batches = Arc::new(Mutex::new(Vec::new()));
    let sink = batches.clone();
    chain.add_conflater(Arc::new(VisualChangeEventConflater::new(move |events| {
        sink.lock().push(events);
    })));
    (chain, batches)
}

#[test]
fn burst_before_first_tick_becomes_one_refresh() {
    let queue = Arc::new(UiQueue::new());
    let (chain, batches) = recording_chain(&queue);
    let layer = LayerId::next();
    for _ in 0..50 {
        chain.handle_layer_event(&LayerEvent::VisualRefresh { layer });
    }
    chain.start().unwrap();

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(queue.pending_count(), 1);
    assert_eq!(chain.count(), 0);
    assert_eq!(chain.refresh_count(), 1);

    assert_eq!(queue.process_pending(), 1);
    let batches = batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 50);
    chain.stop();
}

#[test]
fn scrolling_a_viewport_is_batched() {
    let queue = Arc::new(UiQueue::new());
    let (chain, batches) = recording_chain(&queue);
    let data = DataLayer::new(Arc::new(DummyDataProvider::new(50, 50)), 100, 20);
    let viewport = ViewportLayer::new(data);
    viewport.set_client_area(300, 100);
    register_listener(&(viewport.clone() as Arc<dyn Layer>), &chain);

    for step in 1..=10 {
        viewport.set_origin_x(step * 100);
    }
    assert!(chain.count() > 0);
    chain.flush();
    assert_eq!(queue.process_pending(), 1);

    let batches = batches.lock();
    assert_eq!(batches.len(), 1);
    assert!(batches[0].iter().all(LayerEvent::is_visual));
}

#[test]
fn stopped_chain_keeps_its_queue() {
    let queue = Arc::new(UiQueue::new());
    let (chain, _) = recording_chain(&queue);
    chain.start().unwrap();
    chain.stop();
    chain.handle_layer_event(&LayerEvent::VisualRefresh { layer: LayerId::next() });

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(queue.pending_count(), 0);
    assert_eq!(chain.count(), 1);
}

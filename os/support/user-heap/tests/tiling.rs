use kernel_memory_addresses::VirtualAddress;
use user_heap::{Backing, CoalescePolicy, UserHeap, UserHeapConfig};

const START: u64 = 0x8000_0000;
const PAGE: u64 = 4096;
const PAGES: u64 = 24;

#[derive(Default)]
struct Ledger {
    backed: Vec<(u64, u64)>,
}

impl Backing for Ledger {
    fn request_backing(&mut self, va: VirtualAddress, size: u64) {
        self.backed.push((va.as_u64(), size));
    }

    fn release_backing(&mut self, va: VirtualAddress, size: u64) {
        let pos = self
            .backed
            .iter()
            .position(|&r| r == (va.as_u64(), size))
            .expect("release matches an earlier request");
        self.backed.remove(pos);
    }
}

fn assert_tiles<const S: usize, const R: usize>(heap: &UserHeap<S, R>) {
    let mut blocks: Vec<_> = heap.blocks().map(|(_, b)| b).collect();
    blocks.sort_by_key(|b| b.va);

    let mut cursor = heap.start();
    for b in &blocks {
        assert_eq!(b.va, cursor, "gap or overlap at {cursor}");
        assert!(b.size > 0 && b.size % PAGE == 0);
        cursor = b.end();
    }
    assert_eq!(cursor, heap.end());

    let used = blocks.iter().filter(|b| b.used).count();
    assert_eq!(heap.allocations().len(), used);
}

fn run(policy: CoalescePolicy) {
    let start = VirtualAddress::new(START);
    let config = UserHeapConfig::new().with_coalesce(policy);
    let mut heap = UserHeap::<32, 32>::with_config(start, start + PAGES * PAGE, config);
    let mut ledger = Ledger::default();
    let mut live = Vec::new();

    let sizes = [1, 3 * PAGE, PAGE, 2 * PAGE + 7, 5 * PAGE, PAGE];
    for (round, &size) in sizes.iter().cycle().take(40).enumerate() {
        if round % 4 == 3 && !live.is_empty() {
            let victim = live.swap_remove(round % live.len());
            heap.free(&mut ledger, victim);
        } else if let Ok(va) = heap.allocate(&mut ledger, size) {
            live.push(va);
        }
        assert_tiles(&heap);
        assert_eq!(ledger.backed.len(), live.len());
    }

    for va in live {
        heap.free(&mut ledger, va);
    }
    assert_tiles(&heap);
    assert!(ledger.backed.is_empty());
    let blocks: Vec<_> = heap.blocks().map(|(_, b)| b).collect();
    assert_eq!(blocks.len(), 1);
    assert!(!blocks[0].used);
    assert_eq!(blocks[0].size, PAGES * PAGE);
}

#[test]
fn single_pass_keeps_the_range_tiled() {
    run(CoalescePolicy::SinglePass);
}

#[test]
fn converge_keeps_the_range_tiled() {
    run(CoalescePolicy::Converge);
}

#[test]
fn alloc_then_free_restores_a_fresh_heap() {
    let start = VirtualAddress::new(START);
    let mut heap = UserHeap::<8, 8>::new(start, start + 8 * PAGE);
    let mut ledger = Ledger::default();

    let a = heap.allocate(&mut ledger, 3 * PAGE).unwrap();
    heap.free(&mut ledger, a);

    let blocks: Vec<_> = heap.blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].0, 0);
    assert_eq!(blocks[0].1.size, 8 * PAGE);
    assert!(!blocks[0].1.used);
}

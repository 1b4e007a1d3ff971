use kernel_alloc::vmm::Vmm;
use kernel_alloc::{KernelAllocation, KernelHeap};
use kernel_vmem::addresses::{PageSize, PhysicalAddress, Size4K, VirtualAddress};
use kernel_vmem::soft::{SoftFramePool, SoftPageTable};
use kernel_vmem::{FrameAlloc, PageMapper};

const START: u64 = 0xffff_c000_0000_0000;
const PAGE: u64 = Size4K::SIZE;
const PAGES: u64 = 32;

fn assert_consistent<const R: usize>(
    heap: &KernelHeap<R>,
    table: &SoftPageTable,
    frames: &SoftFramePool,
) {
    let live = heap.allocations();
    for (i, a) in live.iter().enumerate() {
        assert!(a.start >= heap.start() && a.end() <= heap.end());
        assert!(a.end() <= heap.watermark());
        for page in a.pages() {
            let frame = table.frame_at(page.base()).expect("allocated page is mapped");
            assert!(frames.references(frame) >= 1);
        }
        for b in &live[i + 1..] {
            assert!(!a.overlaps(*b), "{a:?} overlaps {b:?}");
        }
    }

    let mapped: u64 = live.iter().map(|a| a.size / PAGE).sum();
    assert_eq!(table.mapped_pages() as u64, mapped);
    assert_eq!((frames.capacity() - frames.free_frames()) as u64, mapped);
}

#[test]
fn mixed_sequence_keeps_heap_consistent() {
    let mut table = SoftPageTable::new();
    let mut frames = SoftFramePool::new(PhysicalAddress::new(0x200_0000), PAGES as usize);
    let mut heap = KernelHeap::<16>::new(
        VirtualAddress::new(START),
        VirtualAddress::new(START + PAGES * PAGE),
    );

    let sizes = [3 * PAGE, 1, 5 * PAGE, PAGE + 1, 4 * PAGE, 7 * PAGE];
    let mut live: Vec<KernelAllocation> = Vec::new();

    for (round, size) in sizes.iter().copied().cycle().take(24).enumerate() {
        let mut vmm = Vmm::new(&mut table, &mut frames);
        if round % 3 == 2 && !live.is_empty() {
            let victim = live.remove(round % live.len());
            assert_eq!(heap.free(&mut vmm, victim.start), Some(victim));
        } else if let Ok(start) = heap.allocate(&mut vmm, size) {
            let size = Size4K::round_up(size).unwrap();
            live.push(KernelAllocation { start, size });
        }
        assert_consistent(&heap, &table, &frames);
    }

    let mut vmm = Vmm::new(&mut table, &mut frames);
    for a in live {
        heap.free(&mut vmm, a.start);
    }
    assert!(heap.allocations().is_empty());
    assert_eq!(table.mapped_pages(), 0);
    assert_eq!(frames.free_frames(), PAGES as usize);
}

#[test]
fn whole_range_is_one_run_after_everything_is_freed() {
    let mut table = SoftPageTable::new();
    let mut frames = SoftFramePool::new(PhysicalAddress::new(0x200_0000), 8);
    let mut vmm = Vmm::new(&mut table, &mut frames);
    let start = VirtualAddress::new(START);
    let mut heap = KernelHeap::<8>::new(start, start + 8 * PAGE);

    let blocks: Vec<_> = (0..4)
        .map(|_| heap.allocate(&mut vmm, 2 * PAGE).unwrap())
        .collect();
    assert_eq!(heap.free_runs(vmm.mapper()).count(), 0);

    for b in [blocks[1], blocks[3], blocks[0], blocks[2]] {
        heap.free(&mut vmm, b);
    }
    let runs: Vec<_> = heap.free_runs(vmm.mapper()).collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].start, start);
    assert_eq!(runs[0].size(), 8 * PAGE);
}

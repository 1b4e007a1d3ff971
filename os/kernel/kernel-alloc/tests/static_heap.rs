use kernel_alloc::{
    install_adapter, kernel_allocate, kernel_free, kernel_reallocate, physical_for_virtual,
    virtual_for_physical,
};
use kernel_info::memory::{KERNEL_HEAP_MAX, KERNEL_HEAP_START, PAGE_SIZE};
use kernel_vmem::addresses::{PhysicalAddress, VirtualAddress};
use kernel_vmem::soft::{SoftFramePool, SoftPageTable};

#[test]
fn static_heap_serves_the_kernel_range() {
    assert_eq!(kernel_allocate(PAGE_SIZE), None, "no adapter installed yet");

    let table = Box::leak(Box::new(SoftPageTable::new()));
    let frames = Box::leak(Box::new(SoftFramePool::new(PhysicalAddress::new(0x100_0000), 64)));
    install_adapter(table, frames);

    let a = kernel_allocate(2 * PAGE_SIZE).unwrap();
    assert_eq!(a, VirtualAddress::new(KERNEL_HEAP_START));
    let b = kernel_allocate(1).unwrap();
    assert_eq!(b, a + 2 * PAGE_SIZE);
    assert!(b.as_u64() < KERNEL_HEAP_MAX);

    let pa = physical_for_virtual(b).unwrap();
    assert_eq!(virtual_for_physical(pa), Some(b));

    kernel_free(a);
    kernel_free(a);
    assert_eq!(physical_for_virtual(a), None);
    assert!(physical_for_virtual(b).is_some());

    let c = kernel_allocate(PAGE_SIZE).unwrap();
    assert_eq!(c, b + PAGE_SIZE, "worst-fit skips the freed two-page hole");

    assert_eq!(kernel_allocate(u64::MAX), None);
}

#[test]
#[should_panic(expected = "cannot reallocate")]
fn reallocation_is_fatal() {
    kernel_reallocate(VirtualAddress::new(KERNEL_HEAP_START), PAGE_SIZE);
}

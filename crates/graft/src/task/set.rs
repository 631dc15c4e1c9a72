// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Task;

/// A non-empty list of parent tasks for a dependent task to wait on.
///
/// Implemented for a lone `Task<P>`, for tuples of tasks up to eight wide
/// (mixed value types welcome - the Rust encoding of a variadic parent pack)
/// and for `Vec<Task<P>>` when the parent count is only known at runtime.
///
/// The dependent task's body receives the list itself - handles, not values -
/// and pulls each value through `parent.future().get()`. By the time the body
/// runs, every parent has published, so those pulls never block.
pub trait TaskSet: Clone + Send + 'static {
    /// Number of parents in the list.
    fn len(&self) -> usize;

    /// Whether the list is empty. An empty list cannot gate a task.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers `notify` with every parent's future. Each registration fires
    /// exactly once, when (or if) that parent publishes.
    fn notify_each_ready<F>(&self, notify: F)
    where
        F: Fn() + Clone + Send + 'static;
}

impl<P: Send + Sync + 'static> TaskSet for Task<P> {
    fn len(&self) -> usize {
        1
    }

    fn notify_each_ready<F>(&self, notify: F)
    where
        F: Fn() + Clone + Send + 'static,
    {
        self.future().on_ready(move |_| notify());
    }
}

impl<P: Send + Sync + 'static> TaskSet for Vec<Task<P>> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn notify_each_ready<F>(&self, notify: F)
    where
        F: Fn() + Clone + Send + 'static,
    {
        for parent in self {
            parent.future().on_ready({
                let notify = notify.clone();
                move |_| notify()
            });
        }
    }
}

macro_rules! impl_task_set_for_tuple {
    ($len:literal: $(($value:ident, $index:tt)),+) => {
        impl<$($value: Send + Sync + 'static),+> TaskSet for ($(Task<$value>,)+) {
            fn len(&self) -> usize {
                $len
            }

            fn notify_each_ready<NotifyFn>(&self, notify: NotifyFn)
            where
                NotifyFn: Fn() + Clone + Send + 'static,
            {
                $(
                    self.$index.future().on_ready({
                        let notify = notify.clone();
                        move |_| notify()
                    });
                )+
            }
        }
    };
}

impl_task_set_for_tuple!(1: (A, 0));
impl_task_set_for_tuple!(2: (A, 0), (B, 1));
impl_task_set_for_tuple!(3: (A, 0), (B, 1), (C, 2));
impl_task_set_for_tuple!(4: (A, 0), (B, 1), (C, 2), (D, 3));
impl_task_set_for_tuple!(5: (A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_task_set_for_tuple!(6: (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_task_set_for_tuple!(7: (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_task_set_for_tuple!(8: (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));

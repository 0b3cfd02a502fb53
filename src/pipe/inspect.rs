/// Passes the item through while performing a side effect.
pub fn inspect<T>(mut f: impl FnMut(&T)) -> impl FnMut(&T) -> Option<T>
where
    T: Clone,
{
    move |item| {
        f(item);
        Some(item.clone())
    }
}

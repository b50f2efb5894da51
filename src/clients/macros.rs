/// Read accessors every collection-backed client exposes: `get_<entity>` and
/// `<entity>s`. The client needs a `collection: CollectionClient<$entity>`
/// field and an error type convertible from `FrameworkError`.
macro_rules! impl_collection_reads {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: String) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    Ok(self.collection.get(id).await?)
                }

                /// Current in-memory collection, newest first.
                #[tracing::instrument(skip(self))]
                pub async fn [<$entity_name_snake s>](&self) -> Result<Vec<$entity>, $error> {
                    tracing::debug!("Sending request");
                    Ok(self.collection.snapshot().await?)
                }
            }
        }
    };
}

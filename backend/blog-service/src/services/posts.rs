/// Post service - post lifecycle, listings, facets and the tag catalogue
use crate::db::{BlogStore, NewPost};
use crate::error::{AppError, Result};
use crate::middleware::check_post_ownership;
use crate::models::{
    CommentView, CreatePostInput, CreateTagInput, PictureAttributes, PictureChange, Post,
    PostChanges, PostDetails, PostSummary, Tag, UpdatePostInput, User,
};
use crate::query::PostQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// One bucket of a facet count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub id: Uuid,
    pub name: String,
    pub post_count: i64,
}

/// Aggregate counts over one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFacets {
    pub tags: Vec<FacetCount>,
    pub authors: Vec<FacetCount>,
    pub private_count: i64,
}

pub struct PostService {
    store: Arc<dyn BlogStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn BlogStore>) -> Self {
        Self { store }
    }

    /// Create a post owned by `owner`
    pub async fn create_post(&self, owner: Uuid, input: CreatePostInput) -> Result<Post> {
        input.validate()?;

        let mut pictures = Vec::with_capacity(input.pictures.len());
        for attrs in input.pictures {
            if attrs.destroy {
                continue;
            }
            if attrs.id.is_some() {
                return Err(AppError::ValidationError(
                    "pictures: cannot reference an existing picture on create".into(),
                ));
            }
            pictures.push((required_image_url(attrs.image_url)?, attrs.caption));
        }

        let post = self
            .store
            .create_post(NewPost {
                user_id: owner,
                title: input.title.trim().to_string(),
                text: input.text,
                private: input.private,
                tag_ids: input.tag_ids,
                pictures,
            })
            .await?;

        tracing::info!(post_id = %post.id, user_id = %owner, "post created");
        Ok(post)
    }

    /// Post together with author, last editor, tags, pictures and comments
    pub async fn get_post_details(&self, post_id: Uuid) -> Result<PostDetails> {
        let post = self.find_post(post_id).await?;

        let author = self.store.get_user(post.user_id).await?.ok_or_else(|| {
            AppError::Internal(format!("owner of post {} is missing", post.id))
        })?;
        let last_editor = match post.last_editor_id {
            Some(editor_id) => self.store.get_user(editor_id).await?,
            None => None,
        };

        let tags = self.store.post_tags(post_id).await?;
        let pictures = self.store.post_pictures(post_id).await?;

        let mut users: HashMap<Uuid, Option<User>> = HashMap::new();
        let mut comments = Vec::new();
        for comment in self.store.post_comments(post_id).await? {
            let owner = match comment.user_id {
                Some(user_id) => {
                    if !users.contains_key(&user_id) {
                        let user = self.store.get_user(user_id).await?;
                        users.insert(user_id, user);
                    }
                    users.get(&user_id).and_then(Option::as_ref)
                }
                None => None,
            };
            comments.push(CommentView::new(comment, owner));
        }

        Ok(PostDetails {
            post,
            author,
            last_editor,
            tags,
            pictures,
            comments,
        })
    }

    /// Update a post; any signed-in user may edit and becomes the last editor
    pub async fn update_post(
        &self,
        editor: Uuid,
        post_id: Uuid,
        input: UpdatePostInput,
    ) -> Result<Post> {
        input.validate()?;

        let pictures = input
            .pictures
            .into_iter()
            .map(picture_change)
            .collect::<Result<Vec<_>>>()?;

        let changes = PostChanges {
            editor_id: editor,
            title: input.title.map(|t| t.trim().to_string()),
            text: input.text,
            private: input.private,
            tag_ids: input.tag_ids,
            pictures,
        };

        let post = self
            .store
            .update_post(post_id, changes)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;

        tracing::info!(post_id = %post.id, editor_id = %editor, "post updated");
        Ok(post)
    }

    /// Destroy a post with its comments, pictures and tag links; owner only
    pub async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let post = self.find_post(post_id).await?;
        check_post_ownership(user_id, &post)?;

        if !self.store.delete_post(post_id).await? {
            return Err(post_not_found(post_id));
        }

        tracing::info!(%post_id, %user_id, "post deleted");
        Ok(())
    }

    pub async fn list_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>> {
        self.store.query_posts(query).await
    }

    /// Counts by tag, author and private flag over the same scope
    pub async fn facets(&self, scope: &PostQuery) -> Result<PostFacets> {
        let tags = self.store.count_posts_by_tags(scope).await?;
        let authors = self.store.count_posts_by_authors(scope).await?;
        let private_count = self.store.count_private_posts(scope).await?;

        Ok(PostFacets {
            tags: tags
                .into_iter()
                .map(|(key, post_count)| FacetCount {
                    id: key.id,
                    name: key.name,
                    post_count,
                })
                .collect(),
            authors: authors
                .into_iter()
                .map(|(key, post_count)| FacetCount {
                    id: key.id,
                    name: key.name,
                    post_count,
                })
                .collect(),
            private_count,
        })
    }

    pub async fn create_tag(&self, input: CreateTagInput) -> Result<Tag> {
        input.validate()?;
        let tag = self.store.create_tag(input.name.trim()).await?;
        tracing::info!(tag_id = %tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.store.list_tags().await
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| post_not_found(post_id))
    }
}

fn post_not_found(post_id: Uuid) -> AppError {
    AppError::NotFound(format!("post {} not found", post_id))
}

fn required_image_url(image_url: Option<String>) -> Result<String> {
    image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError("pictures.image_url: can't be blank".into()))
}

/// Without an id a picture is created; with an id it is updated, or
/// destroyed when `_destroy` is set.
fn picture_change(attrs: PictureAttributes) -> Result<PictureChange> {
    match attrs.id {
        Some(id) if attrs.destroy => Ok(PictureChange::Destroy { id }),
        Some(id) => Ok(PictureChange::Update {
            id,
            image_url: attrs.image_url,
            caption: attrs.caption,
        }),
        None if attrs.destroy => Err(AppError::ValidationError(
            "pictures: _destroy requires an id".into(),
        )),
        None => Ok(PictureChange::Create {
            image_url: required_image_url(attrs.image_url)?,
            caption: attrs.caption,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picture_attributes_map_to_changes() {
        let id = Uuid::new_v4();

        let destroy = PictureAttributes {
            id: Some(id),
            destroy: true,
            ..Default::default()
        };
        assert_eq!(picture_change(destroy).unwrap(), PictureChange::Destroy { id });

        let update = PictureAttributes {
            id: Some(id),
            caption: Some("new caption".into()),
            ..Default::default()
        };
        assert_eq!(
            picture_change(update).unwrap(),
            PictureChange::Update {
                id,
                image_url: None,
                caption: Some("new caption".into()),
            }
        );

        let create = PictureAttributes {
            image_url: Some("https://img.example.com/a.png".into()),
            ..Default::default()
        };
        assert!(matches!(
            picture_change(create).unwrap(),
            PictureChange::Create { .. }
        ));
    }

    #[test]
    fn new_picture_needs_an_image_url() {
        let err = picture_change(PictureAttributes::default()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let orphan_destroy = PictureAttributes {
            destroy: true,
            ..Default::default()
        };
        assert!(picture_change(orphan_destroy).is_err());
    }
}

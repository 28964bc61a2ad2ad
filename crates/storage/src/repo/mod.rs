mod comments;
mod directory;
mod likes;

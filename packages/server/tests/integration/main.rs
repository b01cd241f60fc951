
mod ffmpeg;
mod sample;
mod upload;
